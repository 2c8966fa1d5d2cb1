/// The closed set of labels an expense can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Entertainment,
    Healthcare,
    Shopping,
    Salary,
    Freelance,
    Investment,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Utilities => "Utilities",
            Self::Entertainment => "Entertainment",
            Self::Healthcare => "Healthcare",
            Self::Shopping => "Shopping",
            Self::Salary => "Salary",
            Self::Freelance => "Freelance",
            Self::Investment => "Investment",
            Self::Other => "Other",
        }
    }

    /// Exact-name lookup. Anything outside the enumeration is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == s)
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transport,
            Self::Utilities,
            Self::Entertainment,
            Self::Healthcare,
            Self::Shopping,
            Self::Salary,
            Self::Freelance,
            Self::Investment,
            Self::Other,
        ]
    }

    /// Comma-separated list of every category name, for error messages.
    pub fn names() -> String {
        Self::all()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a budget row caps: one spending category, or all spending in the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BudgetCategory {
    Spending(Category),
    TotalMonthly,
}

impl BudgetCategory {
    pub const TOTAL_MONTHLY: &'static str = "TOTAL_MONTHLY";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spending(c) => c.as_str(),
            Self::TotalMonthly => Self::TOTAL_MONTHLY,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s == Self::TOTAL_MONTHLY {
            Some(Self::TotalMonthly)
        } else {
            Category::parse(s).map(Self::Spending)
        }
    }

    pub fn spending(&self) -> Option<Category> {
        match self {
            Self::Spending(c) => Some(*c),
            Self::TotalMonthly => None,
        }
    }
}

impl std::fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
