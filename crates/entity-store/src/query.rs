use common::{CategoryId, ProductId, UserId};

/// A field a listing can be ordered by.
pub trait SortField: Sized + Copy {
    /// Parses the public name of the field (e.g. `"price"`).
    fn from_name(name: &str) -> Option<Self>;

    /// Returns the SQL column backing the field.
    fn column(&self) -> &'static str;
}

/// One ordering criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub descending: bool,
}

impl<F> SortKey<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Parses a comma separated ordering expression such as `"price,-rating"`.
///
/// A leading `-` means descending. Unknown field names are skipped.
pub fn parse_ordering<F: SortField>(expr: &str) -> Vec<SortKey<F>> {
    expr.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (descending, name) = match part.strip_prefix('-') {
                Some(name) => (true, name),
                None => (false, part),
            };
            match F::from_name(name) {
                Some(field) => Some(SortKey { field, descending }),
                None => {
                    tracing::debug!(field = name, "ignoring unknown ordering field");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortField {
    Price,
    Rating,
}

impl SortField for ProductSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "price" => Some(Self::Price),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSortField {
    Rating,
    CreatedAt,
}

impl SortField for ReviewSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "rating" => Some(Self::Rating),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    CreatedAt,
}

impl SortField for UserSortField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
        }
    }
}

/// Filter and ordering for product listings.
///
/// Filters apply first; results without an explicit ordering come back in
/// creation order, which is also the tie-break for equal sort keys.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Keep only products in any of these categories.
    pub category_ids: Option<Vec<CategoryId>>,

    pub ordering: Vec<SortKey<ProductSortField>>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters to products in any of the given categories.
    pub fn in_categories(mut self, ids: Vec<CategoryId>) -> Self {
        self.category_ids = Some(ids);
        self
    }

    /// Appends an ordering criterion.
    pub fn order_by(mut self, key: SortKey<ProductSortField>) -> Self {
        self.ordering.push(key);
        self
    }
}

/// Filter and ordering for review listings.
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub product_id: Option<ProductId>,
    pub user_id: Option<UserId>,
    pub ordering: Vec<SortKey<ReviewSortField>>,
}

impl ReviewQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    pub fn user(mut self, id: UserId) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn order_by(mut self, key: SortKey<ReviewSortField>) -> Self {
        self.ordering.push(key);
        self
    }
}

/// Ordering for user listings.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub ordering: Vec<SortKey<UserSortField>>,
}

impl UserQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, key: SortKey<UserSortField>) -> Self {
        self.ordering.push(key);
        self
    }
}

/// Renders an `ORDER BY` clause from whitelisted fields, always ending with
/// creation order so results are deterministic.
pub(crate) fn order_by_clause<F: SortField>(ordering: &[SortKey<F>]) -> String {
    let mut parts: Vec<String> = ordering
        .iter()
        .map(|key| {
            let direction = if key.descending { "DESC" } else { "ASC" };
            format!("{} {direction}", key.field.column())
        })
        .collect();
    parts.push("created_at ASC".to_string());
    parts.push("id ASC".to_string());
    format!(" ORDER BY {}", parts.join(", "))
}
