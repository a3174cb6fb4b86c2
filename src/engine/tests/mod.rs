mod helpers;

mod break_tests;
mod sampling_tests;
