//! Engine integration tests
//!
//! Drive a real coordinator against temporary directories and a captured console.

mod rotation;
