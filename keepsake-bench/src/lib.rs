//! Benchmark harness crate for Keepsake. The benches live in `benches/`.
