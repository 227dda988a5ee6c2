//! Usage: Read-only resources for commonly requested accounting views.

use crate::server::protocol::{ReadResourceResult, ResourceContent, ResourceDescriptor};
use crate::shared::error::AppResult;
use crate::xero::operations::{
    AccountsQuery, BalanceSheetQuery, DateRangeQuery, ExecutiveSummaryQuery, ProfitAndLossQuery,
};
use crate::xero::{AccountingOperation, XeroApi};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::json;
use std::sync::Arc;

const CHART_OF_ACCOUNTS_URI: &str = "xero://accounts/chart";
const ACCOUNTS_BY_TYPE_PREFIX: &str = "xero://accounts/";
const ACCOUNTS_BY_TYPE_TEMPLATE: &str = "xero://accounts/{account_type}";
const CURRENT_MONTH_REPORTS_URI: &str = "xero://reports/current_month";
const DASHBOARD_OVERVIEW_URI: &str = "xero://dashboard/overview";

pub fn descriptors() -> Vec<ResourceDescriptor> {
    vec![
        descriptor(
            CHART_OF_ACCOUNTS_URI,
            "Chart of Accounts",
            "The organization's chart of accounts",
        ),
        descriptor(
            ACCOUNTS_BY_TYPE_TEMPLATE,
            "Accounts by Type",
            "Accounts filtered by type (e.g. BANK, REVENUE, EXPENSE)",
        ),
        descriptor(
            CURRENT_MONTH_REPORTS_URI,
            "Current Month Reports",
            "Key financial reports for the current month",
        ),
        descriptor(
            DASHBOARD_OVERVIEW_URI,
            "Financial Overview",
            "A financial overview including bank balances and key metrics",
        ),
    ]
}

pub struct ResourceRouter {
    api: Arc<XeroApi>,
}

impl ResourceRouter {
    pub fn new(api: Arc<XeroApi>) -> Self {
        Self { api }
    }

    /// Read one resource; `None` means the URI is not served here.
    pub async fn read(&self, uri: &str) -> Option<AppResult<ReadResourceResult>> {
        let today = Local::now().date_naive();
        let result = match uri {
            CHART_OF_ACCOUNTS_URI => self.chart_of_accounts().await,
            CURRENT_MONTH_REPORTS_URI => self.current_month_reports(today).await,
            DASHBOARD_OVERVIEW_URI => self.dashboard_overview(today).await,
            _ => match account_type_from_uri(uri) {
                Some(account_type) => self.accounts_by_type(&account_type).await,
                None => return None,
            },
        };
        Some(result.map(|text| ReadResourceResult {
            contents: vec![ResourceContent::text(uri, text)],
        }))
    }

    async fn chart_of_accounts(&self) -> AppResult<String> {
        let accounts = self
            .api
            .execute(&AccountingOperation::GetAccounts(AccountsQuery::default()))
            .await?;
        Ok(pretty(&accounts))
    }

    async fn accounts_by_type(&self, account_type: &str) -> AppResult<String> {
        let accounts = self
            .api
            .execute(&AccountingOperation::GetAccounts(AccountsQuery {
                r#where: Some(format!("Type==\"{account_type}\"")),
            }))
            .await?;
        Ok(pretty(&accounts))
    }

    async fn current_month_reports(&self, today: NaiveDate) -> AppResult<String> {
        let first_of_month = today.with_day(1).unwrap_or(today);
        let profit_and_loss = self
            .api
            .execute(&AccountingOperation::GetProfitAndLoss(ProfitAndLossQuery {
                from_date: iso(first_of_month),
                to_date: iso(today),
                periods: None,
                timeframe: None,
                tracking_category_id: None,
                tracking_category_id_2: None,
                tracking_option_id: None,
                tracking_option_id_2: None,
                standard_layout: true,
                payments_only: false,
            }))
            .await?;
        let balance_sheet = self
            .api
            .execute(&AccountingOperation::GetBalanceSheet(BalanceSheetQuery {
                date: iso(today),
                periods: None,
                timeframe: None,
                tracking_option_id_1: None,
                tracking_option_id_2: None,
                standard_layout: true,
                payments_only: false,
            }))
            .await?;
        Ok(pretty(&json!({
            "profit_and_loss": profit_and_loss,
            "balance_sheet": balance_sheet,
        })))
    }

    async fn dashboard_overview(&self, today: NaiveDate) -> AppResult<String> {
        let bank_summary = self
            .api
            .execute(&AccountingOperation::GetBankSummary(
                DateRangeQuery::default(),
            ))
            .await?;
        let executive_summary = self
            .api
            .execute(&AccountingOperation::GetExecutiveSummary(
                ExecutiveSummaryQuery {
                    date: Some(iso(today)),
                },
            ))
            .await?;
        Ok(pretty(&json!({
            "bank_summary": bank_summary,
            "executive_summary": executive_summary,
        })))
    }
}

/// `xero://accounts/<TYPE>` addresses accounts of one type; the chart URI
/// and the literal template placeholder are not types.
fn account_type_from_uri(uri: &str) -> Option<String> {
    let account_type = uri.strip_prefix(ACCOUNTS_BY_TYPE_PREFIX)?;
    if account_type.is_empty()
        || account_type.contains('/')
        || account_type == "chart"
        || account_type == "{account_type}"
    {
        return None;
    }
    Some(account_type.to_string())
}

fn descriptor(uri: &str, name: &str, description: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: uri.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: Some("application/json".to_string()),
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
