pub mod cli;
pub mod demo;
pub mod run;
