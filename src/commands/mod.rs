pub mod reset;
pub mod run;
pub mod serve;
pub mod status;
