//! Usage: Financial analysis prompt templates.

use crate::server::protocol::{
    GetPromptResult, PromptArgument, PromptDescriptor, PromptMessage, TextContent,
};
use serde_json::Value;

pub fn descriptors() -> Vec<PromptDescriptor> {
    vec![
        PromptDescriptor {
            name: "analyze_financial_data".to_string(),
            description: Some("Create a prompt for analyzing Xero financial data".to_string()),
            arguments: vec![
                required_arg(
                    "report_type",
                    "Type of report to analyze (e.g. \"balance_sheet\", \"profit_and_loss\")",
                ),
                required_arg("date", "Report date in YYYY-MM-DD format"),
            ],
        },
        PromptDescriptor {
            name: "analyze_cash_flow".to_string(),
            description: Some("Create a prompt for analyzing cash flow".to_string()),
            arguments: vec![
                required_arg("from_date", "Start date in YYYY-MM-DD format"),
                required_arg("to_date", "End date in YYYY-MM-DD format"),
            ],
        },
        PromptDescriptor {
            name: "review_financial_health".to_string(),
            description: Some(
                "Create a prompt for reviewing overall financial health".to_string(),
            ),
            arguments: vec![],
        },
        PromptDescriptor {
            name: "analyze_aged_receivables".to_string(),
            description: Some("Create a prompt for analyzing aged receivables".to_string()),
            arguments: vec![PromptArgument {
                name: "contact_id".to_string(),
                description: Some("Optional specific contact to analyze".to_string()),
                required: false,
            }],
        },
        PromptDescriptor {
            name: "budget_variance_analysis".to_string(),
            description: Some("Create a prompt for analyzing budget variances".to_string()),
            arguments: vec![required_arg("date", "Report date in YYYY-MM-DD format")],
        },
    ]
}

/// Render one prompt; `None` means the prompt does not exist,
/// `Some(Err(...))` a missing required argument.
pub fn render(name: &str, arguments: &Value) -> Option<Result<GetPromptResult, String>> {
    let result = match name {
        "analyze_financial_data" => {
            let report_type = match required(arguments, "report_type") {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            let date = match required(arguments, "date") {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            prompt_result(format!(
                "Please analyze this {report_type} report from {date}.\n\
                 Focus on:\n\
                 1. Key financial metrics and ratios\n\
                 2. Notable trends or changes\n\
                 3. Areas that need attention\n\
                 4. Recommendations for improvement\n\n\
                 Report data will be provided separately through the appropriate Xero API call."
            ))
        }
        "analyze_cash_flow" => {
            let from_date = match required(arguments, "from_date") {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            let to_date = match required(arguments, "to_date") {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            prompt_result(format!(
                "Please analyze the cash flow situation from {from_date} to {to_date}.\n\
                 Focus on:\n\
                 1. Operating cash flow trends\n\
                 2. Major cash inflows and outflows\n\
                 3. Working capital management\n\
                 4. Cash flow forecasting\n\
                 5. Recommendations for improving cash position\n\n\
                 Consider:\n\
                 - Bank account balances and movements\n\
                 - Accounts receivable aging\n\
                 - Accounts payable commitments\n\
                 - Upcoming payment obligations"
            ))
        }
        "review_financial_health" => prompt_result(
            "Please analyze the organization's overall financial health.\n\
             Focus on:\n\
             1. Profitability Analysis\n\
                - Gross profit margins\n\
                - Operating margins\n\
                - Net profit trends\n\n\
             2. Liquidity Assessment\n\
                - Current ratio\n\
                - Quick ratio\n\
                - Working capital\n\n\
             3. Efficiency Metrics\n\
                - Accounts receivable turnover\n\
                - Accounts payable turnover\n\
                - Inventory turnover (if applicable)\n\n\
             4. Growth Analysis\n\
                - Revenue growth\n\
                - Profit growth\n\
                - Market share trends\n\n\
             5. Risk Assessment\n\
                - Debt levels\n\
                - Credit risk\n\
                - Operating leverage\n\n\
             Please provide:\n\
             - Key strengths and weaknesses\n\
             - Comparison to industry benchmarks (if available)\n\
             - Specific recommendations for improvement\n\
             - Areas requiring immediate attention"
                .to_string(),
        ),
        "analyze_aged_receivables" => {
            let base = "Please analyze the aged receivables report.\n\
                 Focus on:\n\
                 1. Overall Collection Health\n\
                    - Total outstanding receivables\n\
                    - Age distribution of receivables\n\
                    - Collection efficiency metrics\n\n\
                 2. Risk Assessment\n\
                    - Identify high-risk accounts\n\
                    - Analyze payment patterns\n\
                    - Flag potential bad debts\n\n\
                 3. Action Items\n\
                    - Prioritized collection targets\n\
                    - Recommended follow-up actions\n\
                    - Suggested policy changes\n\n\
                 4. Trends and Patterns\n\
                    - Historical collection trends\n\
                    - Seasonal patterns\n\
                    - Customer payment behaviors";
            let text = match optional(arguments, "contact_id") {
                Some(contact_id) => {
                    format!("{base}\n\nPlease focus specifically on contact ID: {contact_id}")
                }
                None => base.to_string(),
            };
            prompt_result(text)
        }
        "budget_variance_analysis" => {
            let date = match required(arguments, "date") {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            prompt_result(format!(
                "Please analyze the budget variances as of {date}.\n\
                 Focus on:\n\
                 1. Significant Variances\n\
                    - Major favorable and unfavorable variances\n\
                    - Root cause analysis of variances\n\
                    - Impact on overall financial performance\n\n\
                 2. Trend Analysis\n\
                    - Recurring variance patterns\n\
                    - Seasonal factors\n\
                    - Progressive changes over time\n\n\
                 3. Performance Assessment\n\
                    - Department/category performance\n\
                    - Cost control effectiveness\n\
                    - Revenue target achievement\n\n\
                 4. Recommendations\n\
                    - Budget adjustment needs\n\
                    - Control improvement opportunities\n\
                    - Strategic implications\n\n\
                 Please provide actionable insights and specific recommendations for addressing variances."
            ))
        }
        _ => return None,
    };
    Some(Ok(result))
}

fn prompt_result(text: String) -> GetPromptResult {
    GetPromptResult {
        description: None,
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: TextContent::new(text),
        }],
    }
}

fn required_arg(name: &str, description: &str) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: Some(description.to_string()),
        required: true,
    }
}

fn required(arguments: &Value, key: &str) -> Result<String, String> {
    optional(arguments, key).ok_or_else(|| format!("missing required argument: {key}"))
}

fn optional(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
