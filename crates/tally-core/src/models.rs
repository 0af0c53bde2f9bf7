//! Domain models for Tally

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Free-plan users may record at most this many transactions per calendar month
pub const FREE_PLAN_MONTHLY_TRANSACTION_LIMIT: i64 = 10;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Expense,
    Investment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Expense => "expense",
            Self::Investment => "investment",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "expense" => Ok(Self::Expense),
            "investment" => Ok(Self::Investment),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending/income category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Housing,
    Transportation,
    Food,
    Entertainment,
    Health,
    Utility,
    Salary,
    Education,
    Other,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Housing => "housing",
            Self::Transportation => "transportation",
            Self::Food => "food",
            Self::Entertainment => "entertainment",
            Self::Health => "health",
            Self::Utility => "utility",
            Self::Salary => "salary",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for TransactionCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "housing" => Ok(Self::Housing),
            "transportation" => Ok(Self::Transportation),
            "food" => Ok(Self::Food),
            "entertainment" => Ok(Self::Entertainment),
            "health" => Ok(Self::Health),
            "utility" => Ok(Self::Utility),
            "salary" => Ok(Self::Salary),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a transaction was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    BankSlip,
    Cash,
    Pix,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::BankTransfer => "bank_transfer",
            Self::BankSlip => "bank_slip",
            Self::Cash => "cash",
            Self::Pix => "pix",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "bank_transfer" => Ok(Self::BankTransfer),
            "bank_slip" => Ok(Self::BankSlip),
            "cash" => Ok(Self::Cash),
            "pix" => Ok(Self::Pix),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub kind: TransactionKind,
    /// Always positive; `kind` carries the direction
    pub amount: f64,
    pub category: TransactionCategory,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A transaction to be inserted or used as a full replacement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub name: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: TransactionCategory,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("Transaction name is required".into()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidData(
                "Transaction amount must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidData(format!(
                "Month must be between 01 and 12, got {}",
                month
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(Error::InvalidData(format!("Year out of range: {}", year)));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month (UTC)
    pub fn current() -> Self {
        Self::containing(Utc::now().date_naive())
    }

    /// Parse `MM` (in `default_year`) or `YYYY-MM`
    pub fn parse(input: &str, default_year: i32) -> Result<Self> {
        let input = input.trim();
        let invalid = || Error::InvalidData(format!("Invalid month '{}', expected MM or YYYY-MM", input));

        match input.split_once('-') {
            Some((year, month)) if year.len() == 4 && month.len() == 2 => {
                let year = year.parse().map_err(|_| invalid())?;
                let month = month.parse().map_err(|_| invalid())?;
                Self::new(year, month)
            }
            None if input.len() == 2 => {
                let month = input.parse().map_err(|_| invalid())?;
                Self::new(default_year, month)
            }
            _ => Err(invalid()),
        }
    }

    /// First day of the month (inclusive)
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive)
    pub fn end_exclusive(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end_exclusive()
    }
}

impl std::fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Share of each transaction kind in the month's total volume (whole percent)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPercentages {
    pub deposit: i64,
    pub expense: i64,
    pub investment: i64,
}

/// Expenses in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExpense {
    pub category: TransactionCategory,
    pub total_amount: f64,
    /// Share of the month's expenses (whole percent)
    pub percentage_of_total: i64,
}

/// Monthly dashboard summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub period: MonthPeriod,
    pub deposits_total: f64,
    pub investments_total: f64,
    pub expenses_total: f64,
    /// deposits - investments - expenses
    pub balance: f64,
    pub kind_percentages: KindPercentages,
    pub expenses_per_category: Vec<CategoryExpense>,
    pub last_transactions: Vec<Transaction>,
}

/// Whole-number percentage of `part` in `total`; zero when `total` is zero
pub fn percentage_of(part: f64, total: f64) -> i64 {
    if total <= 0.0 {
        return 0;
    }
    ((part / total) * 100.0).round() as i64
}
