mod cli;
mod engine;
mod util;
