//! Hand-written lexer for the legacy HLSL subset.

use hxsl_ast::{BaseType, Interner, Symbol};

use crate::ParseError;

/// A lexical token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token {
    Const,
    Struct,
    CBuffer,
    TBuffer,
    Register,
    PackOffset,
    If,
    Else,
    For,
    Return,
    Discard,
    Break,
    Continue,
    True,
    False,
    Void,
    In,
    Inout,
    Uniform,
    /// A built-in type keyword (`float3`, `sampler2D`, …).
    Type(BaseType),
    Identifier(Symbol),
    IntLiteral(i32),
    FloatLiteral(f32),
    EqualEqual,
    NotEqual,
    LessEqual,
    GreaterEqual,
    AndAnd,
    OrOr,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    TimesEqual,
    DivideEqual,
    /// A single-character token.
    Punct(u8),
    EndOfStream,
}

/// Best-effort display name for a token, used in diagnostics.
pub fn token_name(token: Token, interner: &Interner) -> String {
    match token {
        Token::Const => "const".into(),
        Token::Struct => "struct".into(),
        Token::CBuffer => "cbuffer".into(),
        Token::TBuffer => "tbuffer".into(),
        Token::Register => "register".into(),
        Token::PackOffset => "packoffset".into(),
        Token::If => "if".into(),
        Token::Else => "else".into(),
        Token::For => "for".into(),
        Token::Return => "return".into(),
        Token::Discard => "discard".into(),
        Token::Break => "break".into(),
        Token::Continue => "continue".into(),
        Token::True => "true".into(),
        Token::False => "false".into(),
        Token::Void => "void".into(),
        Token::In => "in".into(),
        Token::Inout => "inout".into(),
        Token::Uniform => "uniform".into(),
        Token::Type(base) => base.desc().name.into(),
        Token::Identifier(symbol) => interner.resolve(symbol).into(),
        Token::IntLiteral(value) => value.to_string(),
        Token::FloatLiteral(value) => value.to_string(),
        Token::EqualEqual => "==".into(),
        Token::NotEqual => "!=".into(),
        Token::LessEqual => "<=".into(),
        Token::GreaterEqual => ">=".into(),
        Token::AndAnd => "&&".into(),
        Token::OrOr => "||".into(),
        Token::PlusPlus => "++".into(),
        Token::MinusMinus => "--".into(),
        Token::PlusEqual => "+=".into(),
        Token::MinusEqual => "-=".into(),
        Token::TimesEqual => "*=".into(),
        Token::DivideEqual => "/=".into(),
        Token::Punct(c) => (c as char).to_string(),
        Token::EndOfStream => "end of file".into(),
    }
}

fn keyword(word: &str) -> Option<Token> {
    use BaseType::*;
    let token = match word {
        "const" => Token::Const,
        "struct" => Token::Struct,
        "cbuffer" => Token::CBuffer,
        "tbuffer" => Token::TBuffer,
        "register" => Token::Register,
        "packoffset" => Token::PackOffset,
        "if" => Token::If,
        "else" => Token::Else,
        "for" => Token::For,
        "return" => Token::Return,
        "discard" => Token::Discard,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "true" => Token::True,
        "false" => Token::False,
        "void" => Token::Void,
        "in" => Token::In,
        "inout" => Token::Inout,
        "uniform" => Token::Uniform,
        "float" => Token::Type(Float),
        "float2" => Token::Type(Float2),
        "float3" => Token::Type(Float3),
        "float4" => Token::Type(Float4),
        "float3x3" => Token::Type(Float3x3),
        "float4x4" => Token::Type(Float4x4),
        "half" => Token::Type(Half),
        "half2" => Token::Type(Half2),
        "half3" => Token::Type(Half3),
        "half4" => Token::Type(Half4),
        "half3x3" => Token::Type(Half3x3),
        "half4x4" => Token::Type(Half4x4),
        "bool" => Token::Type(Bool),
        "int" => Token::Type(Int),
        "int2" => Token::Type(Int2),
        "int3" => Token::Type(Int3),
        "int4" => Token::Type(Int4),
        "uint" => Token::Type(Uint),
        "uint2" => Token::Type(Uint2),
        "uint3" => Token::Type(Uint3),
        "uint4" => Token::Type(Uint4),
        "texture" => Token::Type(Texture),
        "sampler2D" => Token::Type(Sampler2D),
        "samplerCUBE" => Token::Type(SamplerCube),
        _ => return None,
    };
    Some(token)
}

/// Lexes an entire source buffer into `(token, line)` pairs, ending
/// with an [`Token::EndOfStream`] sentinel. Identifiers are interned as
/// they are seen.
pub fn lex(
    source: &str,
    file_name: &str,
    interner: &mut Interner,
) -> Result<Vec<(Token, u32)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 1u32;

    let error = |line: u32, message: String| ParseError {
        file: file_name.to_string(),
        line,
        message,
    };

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b'\n' => {
                line += 1;
                pos += 1;
            }
            b' ' | b'\t' | b'\r' => pos += 1,
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                loop {
                    if pos + 1 >= bytes.len() {
                        return Err(error(line, "Unterminated block comment".into()));
                    }
                    if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                        pos += 2;
                        break;
                    }
                    if bytes[pos] == b'\n' {
                        line += 1;
                    }
                    pos += 1;
                }
            }
            b'#' => {
                // #line directives (our own emitters produce them) are
                // skipped without interpretation; anything else behind
                // a '#' would need a preprocessor.
                let rest = &source[pos + 1..];
                if rest.starts_with("line") {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                } else {
                    return Err(error(line, "Unexpected character '#'".into()));
                }
            }
            b'0'..=b'9' => {
                let (token, len) = scan_number(&bytes[pos..])
                    .ok_or_else(|| error(line, "Malformed numeric literal".into()))?;
                tokens.push((token, line));
                pos += len;
            }
            b'.' if matches!(bytes.get(pos + 1), Some(b'0'..=b'9')) => {
                let (token, len) = scan_number(&bytes[pos..])
                    .ok_or_else(|| error(line, "Malformed numeric literal".into()))?;
                tokens.push((token, line));
                pos += len;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let word = &source[start..pos];
                let token = keyword(word)
                    .unwrap_or_else(|| Token::Identifier(interner.intern(word)));
                tokens.push((token, line));
            }
            _ => {
                let two = &bytes[pos..bytes.len().min(pos + 2)];
                let multi = match two {
                    b"==" => Some(Token::EqualEqual),
                    b"!=" => Some(Token::NotEqual),
                    b"<=" => Some(Token::LessEqual),
                    b">=" => Some(Token::GreaterEqual),
                    b"&&" => Some(Token::AndAnd),
                    b"||" => Some(Token::OrOr),
                    b"++" => Some(Token::PlusPlus),
                    b"--" => Some(Token::MinusMinus),
                    b"+=" => Some(Token::PlusEqual),
                    b"-=" => Some(Token::MinusEqual),
                    b"*=" => Some(Token::TimesEqual),
                    b"/=" => Some(Token::DivideEqual),
                    _ => None,
                };
                if let Some(token) = multi {
                    tokens.push((token, line));
                    pos += 2;
                } else if matches!(
                    c,
                    b'+' | b'-'
                        | b'*'
                        | b'/'
                        | b'<'
                        | b'>'
                        | b'='
                        | b'!'
                        | b'('
                        | b')'
                        | b'{'
                        | b'}'
                        | b'['
                        | b']'
                        | b';'
                        | b','
                        | b':'
                        | b'.'
                        | b'?'
                ) {
                    tokens.push((Token::Punct(c), line));
                    pos += 1;
                } else {
                    return Err(error(
                        line,
                        format!("Unexpected character '{}'", c as char),
                    ));
                }
            }
        }
    }

    tokens.push((Token::EndOfStream, line));
    Ok(tokens)
}

/// Scans a numeric literal at the start of `bytes`, returning the token
/// and the number of bytes consumed.
fn scan_number(bytes: &[u8]) -> Option<(Token, usize)> {
    let mut len = 0usize;
    let mut is_float = false;

    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }
    // A '.' followed by another '.' or an identifier character is a
    // member access, not a fraction.
    if len < bytes.len() && bytes[len] == b'.' && matches!(bytes.get(len + 1), Some(b'0'..=b'9')) {
        is_float = true;
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
    } else if len < bytes.len() && bytes[len] == b'.' && !matches!(bytes.get(len + 1), Some(c) if c.is_ascii_alphanumeric() || *c == b'_')
    {
        // Trailing '.' as in "1."
        is_float = true;
        len += 1;
    }
    if len < bytes.len() && (bytes[len] == b'e' || bytes[len] == b'E') {
        let mut exp = len + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            is_float = true;
            len = exp;
            while len < bytes.len() && bytes[len].is_ascii_digit() {
                len += 1;
            }
        }
    }

    let text = std::str::from_utf8(&bytes[..len]).ok()?;
    let mut consumed = len;
    // Optional float suffix.
    if consumed < bytes.len() && (bytes[consumed] == b'f' || bytes[consumed] == b'h') {
        is_float = true;
        consumed += 1;
    }

    let token = if is_float {
        Token::FloatLiteral(text.parse().ok()?)
    } else {
        Token::IntLiteral(text.parse().ok()?)
    };
    Some((token, consumed))
}
