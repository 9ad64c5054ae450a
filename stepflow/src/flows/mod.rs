//! Ready-made workflows built on the engine.

mod calculator;
mod human;
mod joke;

pub use calculator::{
    calculate_discount, calculate_tax, calculator_flow, calculator_start, extraction_prompt,
    parse_extraction, CalculateEvent, FormatEvent, ParseEvent, CALCULATOR_FLOW,
};
pub use human::{echo_flow, greeting_flow, ECHO_FLOW, GREETING_FLOW, REPLY_KEY};
pub use joke::{joke_flow, joke_start, JokeEvent, JOKE_FLOW};
