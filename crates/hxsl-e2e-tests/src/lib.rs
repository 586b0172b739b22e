//! End-to-end tests for the HXSL pipeline live in `tests/`.
