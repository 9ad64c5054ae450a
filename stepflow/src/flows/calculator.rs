//! Calculator flow: the LLM extracts operands, a local function computes,
//! and the LLM phrases the answer.
//!
//! `start` -> `parse` -> `calculate` -> `format` -> `stop`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::StepContext;
use crate::core::{Event, EventTag, StartEvent, StopEvent, TypedEvent};
use crate::errors::{ParseError, ValidationError};
use crate::llm::LlmClient;
use crate::steps::{Step, StepOutput};
use crate::workflow::Workflow;

/// Name of the built workflow.
pub const CALCULATOR_FLOW: &str = "calculator";

/// Price after taking `discount_percent` off.
#[must_use]
pub fn calculate_discount(price: f64, discount_percent: f64) -> f64 {
    price - price * (discount_percent / 100.0)
}

/// Amount including `tax_rate` percent tax.
#[must_use]
pub fn calculate_tax(amount: f64, tax_rate: f64) -> f64 {
    amount + amount * (tax_rate / 100.0)
}

/// The user question, ready for operand extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseEvent {
    /// Question text.
    pub query: String,
}

impl TypedEvent for ParseEvent {
    const TAG: &'static str = "parse";
}

/// Operands and the function to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateEvent {
    /// Price or amount.
    pub num1: f64,
    /// Percentage.
    pub num2: f64,
    /// `discount` or `tax`.
    pub function_name: String,
}

impl TypedEvent for CalculateEvent {
    const TAG: &'static str = "calculate";
}

/// A computed value to be phrased for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatEvent {
    /// Computed value.
    pub result: f64,
    /// Restatement of what was computed.
    pub original_query: String,
}

impl TypedEvent for FormatEvent {
    const TAG: &'static str = "format";
}

/// Builds the calculator flow. Start it with [`calculator_start`].
pub fn calculator_flow(llm: Arc<dyn LlmClient>) -> Result<Workflow, ValidationError> {
    Workflow::builder(CALCULATOR_FLOW)
        .step(ParseInput)
        .step(ExtractNumbers { llm: llm.clone() })
        .step(PerformCalculation)
        .step(FormatResponse { llm })
        .build()
}

/// Start event carrying `query`.
#[must_use]
pub fn calculator_start(query: impl Into<String>) -> Event {
    StartEvent::new().with("query", query.into()).into_event()
}

/// Prompt asking the model to pull the operands out of `query`.
#[must_use]
pub fn extraction_prompt(query: &str) -> String {
    format!(
        "Extract the two numbers and determine which function to call from this query.
Query: {query}

Available functions:
- discount: Calculate price after discount (price, discount_percent)
- tax: Calculate total with tax (amount, tax_rate)

Respond in this exact format:
NUMBER1: <first number>
NUMBER2: <second number>
FUNCTION: <discount or tax>
"
    )
}

/// Parses the `NUMBER1:` / `NUMBER2:` / `FUNCTION:` reply.
///
/// Labels may come in any order and case. Currency signs, percent signs and
/// thousands separators around the numbers are ignored.
pub fn parse_extraction(reply: &str) -> Result<CalculateEvent, ParseError> {
    Ok(CalculateEvent {
        num1: extraction_number(reply, "NUMBER1")?,
        num2: extraction_number(reply, "NUMBER2")?,
        function_name: extraction_field(reply, "FUNCTION")?.to_lowercase(),
    })
}

fn extraction_field<'a>(reply: &'a str, label: &str) -> Result<&'a str, ParseError> {
    reply
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(label))
        .map(|(_, value)| value.trim())
        .ok_or_else(|| ParseError::new(format!("Missing {label} in model reply")).with_raw(reply))
}

fn extraction_number(reply: &str, label: &str) -> Result<f64, ParseError> {
    let raw = extraction_field(reply, label)?;
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '%' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().map_err(|e| {
        ParseError::new(format!("{label} is not a number ({raw}): {e}")).with_raw(reply)
    })
}

/// Renders a float the way the prompts show numbers: whole values keep one
/// decimal (`100.0`), others use the shortest exact form.
fn display_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[derive(Debug)]
struct ParseInput;

#[async_trait]
impl Step for ParseInput {
    fn name(&self) -> &str {
        "parse_input"
    }

    fn accepts(&self) -> EventTag {
        StartEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![ParseEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let query = event.require_str("query")?;
        tracing::info!(query, "Parsing input");
        Ok(StepOutput::typed(&ParseEvent {
            query: query.to_string(),
        })?)
    }
}

#[derive(Debug)]
struct ExtractNumbers {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for ExtractNumbers {
    fn name(&self) -> &str {
        "extract_numbers"
    }

    fn accepts(&self) -> EventTag {
        ParseEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![CalculateEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let ParseEvent { query } = event.to_typed()?;
        let reply = self.llm.complete(&extraction_prompt(&query)).await?;
        let calculation = parse_extraction(&reply.text)?;

        tracing::info!(
            num1 = calculation.num1,
            num2 = calculation.num2,
            function = %calculation.function_name,
            "Extracted operands"
        );
        Ok(StepOutput::typed(&calculation)?)
    }
}

#[derive(Debug)]
struct PerformCalculation;

#[async_trait]
impl Step for PerformCalculation {
    fn name(&self) -> &str {
        "perform_calculation"
    }

    fn accepts(&self) -> EventTag {
        CalculateEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![FormatEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let CalculateEvent {
            num1,
            num2,
            function_name,
        } = event.to_typed()?;

        let (result, original_query) = match function_name.as_str() {
            "discount" => (
                calculate_discount(num1, num2),
                format!("${} with {}% discount", display_number(num1), display_number(num2)),
            ),
            "tax" => (
                calculate_tax(num1, num2),
                format!("${} with {}% tax", display_number(num1), display_number(num2)),
            ),
            other => {
                tracing::warn!(function = other, "Unknown calculator function");
                (0.0, format!("unknown function: {other}"))
            }
        };

        tracing::info!(result = %format!("{result:.2}"), "Calculated");
        Ok(StepOutput::typed(&FormatEvent {
            result,
            original_query,
        })?)
    }
}

#[derive(Debug)]
struct FormatResponse {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for FormatResponse {
    fn name(&self) -> &str {
        "format_response"
    }

    fn accepts(&self) -> EventTag {
        FormatEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![StopEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let FormatEvent {
            result,
            original_query,
        } = event.to_typed()?;
        let prompt = format!(
            "Create a friendly response for this calculation:\nQuestion: {original_query}\nAnswer: {}\n\nMake it conversational and natural.",
            display_number(result)
        );
        let response = self.llm.complete(&prompt).await?;
        Ok(StepOutput::stop(response.text))
    }
}
