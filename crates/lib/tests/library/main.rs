//! Library integration tests: complete builds against applications laid out
//! in temporary directories, with the JVM simulated.

mod common;

mod build_tests;
