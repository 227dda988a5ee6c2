//! Usage: Enumerated accounting read operations and their request mapping.
//!
//! Every exposed operation is a closed enum variant with a typed parameter
//! struct; each maps to a relative path under the accounting API, a query
//! list, an optional If-Modified-Since header, and the payload key the
//! response nests its data under.

use serde::Deserialize;

/// One outbound accounting API request, fully determined by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub if_modified_since: Option<String>,
    pub payload_key: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AccountsQuery {
    #[serde(default)]
    pub r#where: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContactsQuery {
    #[serde(default)]
    pub r#where: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub contact_ids: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub summary_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InvoicesQuery {
    #[serde(default)]
    pub r#where: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub modified_after: Option<String>,
    #[serde(default)]
    pub ids: Option<String>,
    #[serde(default)]
    pub invoice_numbers: Option<String>,
    #[serde(default)]
    pub contact_ids: Option<String>,
    #[serde(default)]
    pub statuses: Option<String>,
    #[serde(default)]
    pub summary_only: bool,
}

/// Shared by payments and bank transactions; the two endpoints take the same
/// filter surface.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub r#where: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub modified_after: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BalanceSheetQuery {
    pub date: String,
    #[serde(default)]
    pub periods: Option<u32>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub tracking_option_id_1: Option<String>,
    #[serde(default)]
    pub tracking_option_id_2: Option<String>,
    #[serde(default = "default_true")]
    pub standard_layout: bool,
    #[serde(default)]
    pub payments_only: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProfitAndLossQuery {
    pub from_date: String,
    pub to_date: String,
    #[serde(default)]
    pub periods: Option<u32>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub tracking_category_id: Option<String>,
    #[serde(default)]
    pub tracking_category_id_2: Option<String>,
    #[serde(default)]
    pub tracking_option_id: Option<String>,
    #[serde(default)]
    pub tracking_option_id_2: Option<String>,
    #[serde(default = "default_true")]
    pub standard_layout: bool,
    #[serde(default)]
    pub payments_only: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgedReportQuery {
    pub contact_id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DateRangeQuery {
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BudgetSummaryQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub periods: Option<u32>,
    #[serde(default)]
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutiveSummaryQuery {
    #[serde(default)]
    pub date: Option<String>,
}

/// The closed set of accounting reads the server exposes. No reflection, no
/// pass-through endpoint names from callers.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountingOperation {
    GetAccounts(AccountsQuery),
    GetContacts(ContactsQuery),
    GetInvoices(InvoicesQuery),
    GetPayments(TransactionsQuery),
    GetBankTransactions(TransactionsQuery),
    GetBalanceSheet(BalanceSheetQuery),
    GetProfitAndLoss(ProfitAndLossQuery),
    GetAgedPayablesByContact(AgedReportQuery),
    GetAgedReceivablesByContact(AgedReportQuery),
    GetBankSummary(DateRangeQuery),
    GetBudgetSummary(BudgetSummaryQuery),
    GetExecutiveSummary(ExecutiveSummaryQuery),
}

impl AccountingOperation {
    pub fn request(&self) -> ApiRequest {
        match self {
            Self::GetAccounts(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "where", q.r#where.as_deref());
                ApiRequest {
                    path: "Accounts",
                    query,
                    if_modified_since: None,
                    payload_key: "Accounts",
                }
            }
            Self::GetContacts(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "where", q.r#where.as_deref());
                push_num(&mut query, "page", q.page);
                push_opt(&mut query, "searchTerm", q.search_term.as_deref());
                push_opt(&mut query, "IDs", q.contact_ids.as_deref());
                push_flag(&mut query, "includeArchived", q.include_archived);
                push_flag(&mut query, "summaryOnly", q.summary_only);
                ApiRequest {
                    path: "Contacts",
                    query,
                    if_modified_since: None,
                    payload_key: "Contacts",
                }
            }
            Self::GetInvoices(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "where", q.r#where.as_deref());
                push_opt(&mut query, "order", q.order.as_deref());
                push_num(&mut query, "page", q.page);
                push_opt(&mut query, "IDs", q.ids.as_deref());
                push_opt(&mut query, "InvoiceNumbers", q.invoice_numbers.as_deref());
                push_opt(&mut query, "ContactIDs", q.contact_ids.as_deref());
                push_opt(&mut query, "Statuses", q.statuses.as_deref());
                push_flag(&mut query, "summaryOnly", q.summary_only);
                ApiRequest {
                    path: "Invoices",
                    query,
                    if_modified_since: q.modified_after.clone(),
                    payload_key: "Invoices",
                }
            }
            Self::GetPayments(q) => transactions_request(q, "Payments", "Payments"),
            Self::GetBankTransactions(q) => {
                transactions_request(q, "BankTransactions", "BankTransactions")
            }
            Self::GetBalanceSheet(q) => {
                let mut query = vec![("date", q.date.clone())];
                push_num(&mut query, "periods", q.periods);
                push_opt(&mut query, "timeframe", q.timeframe.as_deref());
                push_opt(
                    &mut query,
                    "trackingOptionID1",
                    q.tracking_option_id_1.as_deref(),
                );
                push_opt(
                    &mut query,
                    "trackingOptionID2",
                    q.tracking_option_id_2.as_deref(),
                );
                query.push(("standardLayout", q.standard_layout.to_string()));
                query.push(("paymentsOnly", q.payments_only.to_string()));
                ApiRequest {
                    path: "Reports/BalanceSheet",
                    query,
                    if_modified_since: None,
                    payload_key: "Reports",
                }
            }
            Self::GetProfitAndLoss(q) => {
                let mut query = vec![
                    ("fromDate", q.from_date.clone()),
                    ("toDate", q.to_date.clone()),
                ];
                push_num(&mut query, "periods", q.periods);
                push_opt(&mut query, "timeframe", q.timeframe.as_deref());
                push_opt(
                    &mut query,
                    "trackingCategoryID",
                    q.tracking_category_id.as_deref(),
                );
                push_opt(
                    &mut query,
                    "trackingCategoryID2",
                    q.tracking_category_id_2.as_deref(),
                );
                push_opt(&mut query, "trackingOptionID", q.tracking_option_id.as_deref());
                push_opt(
                    &mut query,
                    "trackingOptionID2",
                    q.tracking_option_id_2.as_deref(),
                );
                query.push(("standardLayout", q.standard_layout.to_string()));
                query.push(("paymentsOnly", q.payments_only.to_string()));
                ApiRequest {
                    path: "Reports/ProfitAndLoss",
                    query,
                    if_modified_since: None,
                    payload_key: "Reports",
                }
            }
            Self::GetAgedPayablesByContact(q) => {
                aged_report_request(q, "Reports/AgedPayablesByContact")
            }
            Self::GetAgedReceivablesByContact(q) => {
                aged_report_request(q, "Reports/AgedReceivablesByContact")
            }
            Self::GetBankSummary(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "fromDate", q.from_date.as_deref());
                push_opt(&mut query, "toDate", q.to_date.as_deref());
                ApiRequest {
                    path: "Reports/BankSummary",
                    query,
                    if_modified_since: None,
                    payload_key: "Reports",
                }
            }
            Self::GetBudgetSummary(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "date", q.date.as_deref());
                push_num(&mut query, "periods", q.periods);
                push_opt(&mut query, "timeframe", q.timeframe.as_deref());
                ApiRequest {
                    path: "Reports/BudgetSummary",
                    query,
                    if_modified_since: None,
                    payload_key: "Reports",
                }
            }
            Self::GetExecutiveSummary(q) => {
                let mut query = Vec::new();
                push_opt(&mut query, "date", q.date.as_deref());
                ApiRequest {
                    path: "Reports/ExecutiveSummary",
                    query,
                    if_modified_since: None,
                    payload_key: "Reports",
                }
            }
        }
    }
}

fn transactions_request(
    q: &TransactionsQuery,
    path: &'static str,
    payload_key: &'static str,
) -> ApiRequest {
    let mut query = Vec::new();
    push_opt(&mut query, "where", q.r#where.as_deref());
    push_opt(&mut query, "order", q.order.as_deref());
    push_num(&mut query, "page", q.page);
    ApiRequest {
        path,
        query,
        if_modified_since: q.modified_after.clone(),
        payload_key,
    }
}

fn aged_report_request(q: &AgedReportQuery, path: &'static str) -> ApiRequest {
    let mut query = vec![("contactID", q.contact_id.clone())];
    push_opt(&mut query, "date", q.date.as_deref());
    push_opt(&mut query, "fromDate", q.from_date.as_deref());
    push_opt(&mut query, "toDate", q.to_date.as_deref());
    ApiRequest {
        path,
        query,
        if_modified_since: None,
        payload_key: "Reports",
    }
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        query.push((key, value.to_string()));
    }
}

fn push_num(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<u32>) {
    if let Some(value) = value {
        query.push((key, value.to_string()));
    }
}

fn push_flag(query: &mut Vec<(&'static str, String)>, key: &'static str, value: bool) {
    if value {
        query.push((key, "true".to_string()));
    }
}

fn default_true() -> bool {
    true
}
