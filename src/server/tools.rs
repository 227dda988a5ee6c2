//! Usage: Tool table and dispatch for the accounting server.
//!
//! Three auth/debug tools plus one tool per enumerated accounting operation.
//! Tool failures become in-band error results; the transport layer only
//! rejects protocol-level problems.

use crate::auth::AuthStatus;
use crate::server::protocol::{CallToolResult, McpTool};
use crate::shared::error::AppResult;
use crate::xero::operations::{
    AccountsQuery, AgedReportQuery, BalanceSheetQuery, BudgetSummaryQuery, ContactsQuery,
    DateRangeQuery, ExecutiveSummaryQuery, InvoicesQuery, ProfitAndLossQuery, TransactionsQuery,
};
use crate::xero::{AccountingOperation, XeroApi};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub struct ToolRouter {
    api: Arc<XeroApi>,
}

impl ToolRouter {
    pub fn new(api: Arc<XeroApi>) -> Self {
        Self { api }
    }

    pub fn definitions(&self) -> Vec<McpTool> {
        vec![
            tool(
                "xero_authenticate",
                "Start the Xero OAuth flow and automatically handle the callback",
                schema(json!({}), &[]),
            ),
            tool(
                "xero_get_auth_status",
                "Check the current authentication status",
                schema(json!({}), &[]),
            ),
            tool(
                "xero_get_config_info",
                "Retrieve configuration and debug information",
                schema(json!({}), &[]),
            ),
            tool(
                "xero_get_accounts",
                "Retrieve accounts from Xero",
                schema(json!({"where": {"type": "string"}}), &[]),
            ),
            tool(
                "xero_get_contacts",
                "Retrieve contacts from Xero",
                schema(
                    json!({
                        "where": {"type": "string"},
                        "page": {"type": "integer"},
                        "search_term": {"type": "string"},
                        "contact_ids": {"type": "string"},
                        "include_archived": {"type": "boolean"},
                        "summary_only": {"type": "boolean"},
                    }),
                    &[],
                ),
            ),
            tool(
                "xero_get_invoices",
                "Retrieve invoices from Xero",
                schema(
                    json!({
                        "where": {"type": "string"},
                        "order": {"type": "string"},
                        "page": {"type": "integer"},
                        "modified_after": {"type": "string"},
                        "ids": {"type": "string"},
                        "invoice_numbers": {"type": "string"},
                        "contact_ids": {"type": "string"},
                        "statuses": {"type": "string"},
                        "summary_only": {"type": "boolean"},
                    }),
                    &[],
                ),
            ),
            tool(
                "xero_get_payments",
                "Retrieve payments from Xero",
                transactions_schema(),
            ),
            tool(
                "xero_get_bank_transactions",
                "Retrieve bank transactions from Xero",
                transactions_schema(),
            ),
            tool(
                "xero_get_balance_sheet",
                "Retrieve a Balance Sheet report from Xero",
                schema(
                    json!({
                        "date": {"type": "string", "description": "Report date in YYYY-MM-DD format"},
                        "periods": {"type": "integer"},
                        "timeframe": {"type": "string"},
                        "tracking_option_id_1": {"type": "string"},
                        "tracking_option_id_2": {"type": "string"},
                        "standard_layout": {"type": "boolean"},
                        "payments_only": {"type": "boolean"},
                    }),
                    &["date"],
                ),
            ),
            tool(
                "xero_get_profit_and_loss",
                "Retrieve a Profit and Loss report from Xero",
                schema(
                    json!({
                        "from_date": {"type": "string", "description": "Start date in YYYY-MM-DD format"},
                        "to_date": {"type": "string", "description": "End date in YYYY-MM-DD format"},
                        "periods": {"type": "integer"},
                        "timeframe": {"type": "string"},
                        "tracking_category_id": {"type": "string"},
                        "tracking_category_id_2": {"type": "string"},
                        "tracking_option_id": {"type": "string"},
                        "tracking_option_id_2": {"type": "string"},
                        "standard_layout": {"type": "boolean"},
                        "payments_only": {"type": "boolean"},
                    }),
                    &["from_date", "to_date"],
                ),
            ),
            tool(
                "xero_get_aged_payables_by_contact",
                "Retrieve an Aged Payables by Contact report from Xero",
                aged_report_schema(),
            ),
            tool(
                "xero_get_aged_receivables_by_contact",
                "Retrieve an Aged Receivables by Contact report from Xero",
                aged_report_schema(),
            ),
            tool(
                "xero_get_bank_summary",
                "Retrieve a Bank Summary report from Xero",
                schema(
                    json!({
                        "from_date": {"type": "string"},
                        "to_date": {"type": "string"},
                    }),
                    &[],
                ),
            ),
            tool(
                "xero_get_budget_summary",
                "Retrieve a Budget Summary report from Xero",
                schema(
                    json!({
                        "date": {"type": "string"},
                        "periods": {"type": "integer"},
                        "timeframe": {"type": "string"},
                    }),
                    &[],
                ),
            ),
            tool(
                "xero_get_executive_summary",
                "Retrieve an Executive Summary report from Xero",
                schema(json!({"date": {"type": "string"}}), &[]),
            ),
        ]
    }

    /// Dispatch one call; `None` means the tool does not exist.
    pub async fn call(&self, name: &str, arguments: Value) -> Option<CallToolResult> {
        let result = match name {
            "xero_authenticate" => self.authenticate().await,
            "xero_get_auth_status" => self.auth_status_text().await,
            "xero_get_config_info" => self.config_info().await,
            "xero_get_accounts" => {
                self.run(arguments, |q: AccountsQuery| {
                    AccountingOperation::GetAccounts(q)
                })
                .await
            }
            "xero_get_contacts" => {
                self.run(arguments, |q: ContactsQuery| {
                    AccountingOperation::GetContacts(q)
                })
                .await
            }
            "xero_get_invoices" => {
                self.run(arguments, |q: InvoicesQuery| {
                    AccountingOperation::GetInvoices(q)
                })
                .await
            }
            "xero_get_payments" => {
                self.run(arguments, |q: TransactionsQuery| {
                    AccountingOperation::GetPayments(q)
                })
                .await
            }
            "xero_get_bank_transactions" => {
                self.run(arguments, |q: TransactionsQuery| {
                    AccountingOperation::GetBankTransactions(q)
                })
                .await
            }
            "xero_get_balance_sheet" => {
                self.run(arguments, |q: BalanceSheetQuery| {
                    AccountingOperation::GetBalanceSheet(q)
                })
                .await
            }
            "xero_get_profit_and_loss" => {
                self.run(arguments, |q: ProfitAndLossQuery| {
                    AccountingOperation::GetProfitAndLoss(q)
                })
                .await
            }
            "xero_get_aged_payables_by_contact" => {
                self.run(arguments, |q: AgedReportQuery| {
                    AccountingOperation::GetAgedPayablesByContact(q)
                })
                .await
            }
            "xero_get_aged_receivables_by_contact" => {
                self.run(arguments, |q: AgedReportQuery| {
                    AccountingOperation::GetAgedReceivablesByContact(q)
                })
                .await
            }
            "xero_get_bank_summary" => {
                self.run(arguments, |q: DateRangeQuery| {
                    AccountingOperation::GetBankSummary(q)
                })
                .await
            }
            "xero_get_budget_summary" => {
                self.run(arguments, |q: BudgetSummaryQuery| {
                    AccountingOperation::GetBudgetSummary(q)
                })
                .await
            }
            "xero_get_executive_summary" => {
                self.run(arguments, |q: ExecutiveSummaryQuery| {
                    AccountingOperation::GetExecutiveSummary(q)
                })
                .await
            }
            _ => return None,
        };
        Some(result)
    }

    async fn run<Q, F>(&self, arguments: Value, build: F) -> CallToolResult
    where
        Q: DeserializeOwned,
        F: FnOnce(Q) -> AccountingOperation,
    {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };
        let query: Q = match serde_json::from_value(arguments) {
            Ok(q) => q,
            Err(e) => return CallToolResult::error(format!("invalid arguments: {e}")),
        };
        match self.api.execute(&build(query)).await {
            Ok(payload) => CallToolResult::text(pretty(&payload)),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn authenticate(&self) -> CallToolResult {
        match self.api.facade().start_auth_flow().await {
            Ok(_) => CallToolResult::text("Authentication completed successfully"),
            Err(crate::shared::error::AppError::AlreadyAuthenticated) => {
                CallToolResult::text("Already authenticated")
            }
            Err(e) => CallToolResult::error(format!("Authentication failed: {e}")),
        }
    }

    async fn auth_status_text(&self) -> CallToolResult {
        match self.api.facade().auth_status().await {
            Ok(AuthStatus::Unauthenticated) => CallToolResult::text("Not authenticated"),
            Ok(AuthStatus::Expired) => CallToolResult::text("Token expired"),
            Ok(AuthStatus::Authenticated { expires_in }) => CallToolResult::text(format!(
                "Authenticated (token expires in {expires_in} seconds)"
            )),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn config_info(&self) -> CallToolResult {
        match self.build_config_info().await {
            Ok(info) => CallToolResult::text(pretty(&info)),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn build_config_info(&self) -> AppResult<Value> {
        let facade = self.api.facade();
        let status = facade.auth_status().await?;
        let token_path = facade.token_file();
        let config_dir = token_path.parent();

        // Presence only; credential values never leave the process.
        Ok(json!({
            "environment_variables": {
                "XERO_CLIENT_ID": env_is_set("XERO_CLIENT_ID"),
                "XERO_CLIENT_SECRET": env_is_set("XERO_CLIENT_SECRET"),
                "XERO_CONFIG_DIR": env_is_set("XERO_CONFIG_DIR"),
            },
            "config_directory": {
                "config_dir": config_dir.map(|p| p.display().to_string()),
                "config_dir_exists": config_dir.map(Path::exists),
            },
            "token_file": {
                "token_file_path": token_path.display().to_string(),
                "token_file_exists": token_path.exists(),
            },
            "authentication": {
                "token_loaded": status != AuthStatus::Unauthenticated,
                "token_expired": status == AuthStatus::Expired,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

fn env_is_set(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn tool(name: &str, description: &str, input_schema: Value) -> McpTool {
    McpTool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn transactions_schema() -> Value {
    schema(
        json!({
            "where": {"type": "string"},
            "order": {"type": "string"},
            "page": {"type": "integer"},
            "modified_after": {"type": "string"},
        }),
        &[],
    )
}

fn aged_report_schema() -> Value {
    schema(
        json!({
            "contact_id": {"type": "string"},
            "date": {"type": "string"},
            "from_date": {"type": "string"},
            "to_date": {"type": "string"},
        }),
        &["contact_id"],
    )
}
