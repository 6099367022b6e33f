//! Query-option providers and the fluent traits that expose them.
//!
//! # Design
//! Each provider owns one piece of URL query state (filters, sort,
//! pagination, field selection, shuffle, view) and knows how to write itself
//! into a `QueryParams`. A builder embeds the providers it supports and
//! implements the matching trait by handing out `&mut` access to the
//! provider; the trait's provided methods supply the fluent API. Builders
//! therefore share one implementation of every option instead of repeating
//! it per operation.
//!
//! Bring the traits into scope with `use nocodb_client::prelude::*;`.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::filter::{DateWithinSubOperator, Filter, LogicalOperator};

/// URL query parameters with set semantics. Keys render in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Writes accumulated option state into the query string.
pub trait ApplyQuery {
    fn apply(&self, query: &mut QueryParams);
}

// --- filters ---

/// Accumulated `where` expressions. Multiple expressions are joined with
/// `~and` into a single parameter; an expression that is not already one
/// parenthesized term is wrapped first, so `(a)~or(b)` followed by `(c)`
/// becomes `((a)~or(b))~and(c)`.
#[derive(Debug, Clone, Default)]
pub struct FilterProvider {
    raw: Vec<String>,
}

impl FilterProvider {
    pub fn push(&mut self, expr: impl fmt::Display) {
        let expr = expr.to_string();
        if !expr.is_empty() {
            self.raw.push(expr);
        }
    }

    /// The combined expression, if any filter was added.
    pub fn expression(&self) -> Option<String> {
        match self.raw.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            many => {
                let terms: Vec<String> = many
                    .iter()
                    .map(|expr| {
                        if is_single_term(expr) {
                            expr.clone()
                        } else {
                            format!("({expr})")
                        }
                    })
                    .collect();
                Some(terms.join(LogicalOperator::And.as_str()))
            }
        }
    }
}

/// Whether `expr` is one parenthesized term, optionally negated:
/// `(a,eq,1)`, `((a,eq,1)~or(b,eq,2))` or `~not(a,eq,1)`.
fn is_single_term(expr: &str) -> bool {
    let expr = expr.strip_prefix(LogicalOperator::Not.as_str()).unwrap_or(expr);
    if !expr.starts_with('(') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1 == expr.len();
                }
            }
            _ => {}
        }
    }
    false
}

impl ApplyQuery for FilterProvider {
    fn apply(&self, query: &mut QueryParams) {
        if let Some(expr) = self.expression() {
            query.set("where", expr);
        }
    }
}

/// Filtering through the `where` query parameter.
///
/// ```ignore
/// table.list_records()
///     .where_greater_than("Age", 18)
///     .where_is_like("Email", "%@example.com")
///     .execute()?;
/// ```
pub trait Filterable: Sized {
    #[doc(hidden)]
    fn filter_provider(&mut self) -> &mut FilterProvider;

    /// Add a raw expression, a `Filter` or a `FilterGroup`. Empty strings are ignored.
    ///
    /// ```ignore
    /// query.where_expr("(Check,eq,55)~or((Amount,gt,10)~and(Amount,lt,20))")
    /// ```
    fn where_expr(mut self, expr: impl fmt::Display) -> Self {
        self.filter_provider().push(expr);
        self
    }

    fn where_equal_to(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::equal_to(column, value))
    }

    fn where_not_equal_to(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::not_equal_to(column, value))
    }

    fn where_greater_than(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::greater_than(column, value))
    }

    fn where_greater_than_or_equal(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::greater_than_or_equal(column, value))
    }

    fn where_less_than(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::less_than(column, value))
    }

    fn where_less_than_or_equal(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.where_expr(Filter::less_than_or_equal(column, value))
    }

    fn where_is_null(self, column: impl Into<String>) -> Self {
        self.where_expr(Filter::is_null(column))
    }

    fn where_is_not_null(self, column: impl Into<String>) -> Self {
        self.where_expr(Filter::is_not_null(column))
    }

    fn where_is_true(self, column: impl Into<String>) -> Self {
        self.where_expr(Filter::is_true(column))
    }

    fn where_is_false(self, column: impl Into<String>) -> Self {
        self.where_expr(Filter::is_false(column))
    }

    /// No-op when `values` is empty.
    fn where_is_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        with_list_filter(self, Filter::is_in(column, values))
    }

    fn where_is_between(self, column: impl Into<String>, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        self.where_expr(Filter::between(column, min, max))
    }

    fn where_is_not_between(
        self,
        column: impl Into<String>,
        min: impl fmt::Display,
        max: impl fmt::Display,
    ) -> Self {
        self.where_expr(Filter::not_between(column, min, max))
    }

    fn where_is_like(self, column: impl Into<String>, pattern: impl fmt::Display) -> Self {
        self.where_expr(Filter::like(column, pattern))
    }

    fn where_is_not_like(self, column: impl Into<String>, pattern: impl fmt::Display) -> Self {
        self.where_expr(Filter::not_like(column, pattern))
    }

    /// Date/DateTime columns only; see `DateWithinSubOperator`.
    fn where_is_within(self, column: impl Into<String>, sub_operator: DateWithinSubOperator) -> Self {
        self.where_expr(Filter::within(column, sub_operator))
    }

    /// No-op when `values` is empty.
    fn where_all_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        with_list_filter(self, Filter::all_of(column, values))
    }

    /// No-op when `values` is empty.
    fn where_any_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        with_list_filter(self, Filter::any_of(column, values))
    }

    /// No-op when `values` is empty.
    fn where_not_all_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        with_list_filter(self, Filter::not_all_of(column, values))
    }

    /// No-op when `values` is empty.
    fn where_not_any_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        with_list_filter(self, Filter::not_any_of(column, values))
    }
}

/// Add a list-valued filter unless it carries no values.
fn with_list_filter<B: Filterable>(builder: B, filter: Filter) -> B {
    if filter.values.is_empty() {
        return builder;
    }
    builder.where_expr(filter)
}

// --- sort ---

/// Direction of a sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort criterion; renders as `column` or `-column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => f.write_str(&self.column),
            SortDirection::Desc => write!(f, "-{}", self.column),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SortProvider {
    sorts: Vec<Sort>,
}

impl ApplyQuery for SortProvider {
    fn apply(&self, query: &mut QueryParams) {
        if self.sorts.is_empty() {
            return;
        }
        let rendered: Vec<String> = self.sorts.iter().map(Sort::to_string).collect();
        query.set("sort", rendered.join(","));
    }
}

/// Sorting through the `sort` query parameter. Criteria apply in call order.
pub trait Sortable: Sized {
    #[doc(hidden)]
    fn sort_provider(&mut self) -> &mut SortProvider;

    fn sort_by(mut self, sort: Sort) -> Self {
        self.sort_provider().sorts.push(sort);
        self
    }

    fn sort_asc_by(self, column: impl Into<String>) -> Self {
        self.sort_by(Sort::asc(column))
    }

    fn sort_desc_by(self, column: impl Into<String>) -> Self {
        self.sort_by(Sort::desc(column))
    }
}

// --- pagination ---

#[derive(Debug, Clone, Default)]
pub struct PaginationProvider {
    limit: usize,
    offset: usize,
}

impl ApplyQuery for PaginationProvider {
    fn apply(&self, query: &mut QueryParams) {
        if self.limit > 0 {
            query.set("limit", self.limit.to_string());
        }
        if self.offset > 0 {
            query.set("offset", self.offset.to_string());
        }
    }
}

/// Pagination through the `limit` and `offset` query parameters.
pub trait Paginated: Sized {
    #[doc(hidden)]
    fn pagination_provider(&mut self) -> &mut PaginationProvider;

    /// Maximum number of records to return. Zero is ignored.
    fn limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.pagination_provider().limit = limit;
        }
        self
    }

    /// Number of records to skip.
    fn offset(mut self, offset: usize) -> Self {
        self.pagination_provider().offset = offset;
        self
    }

    /// 1-based page of `page_size` records. Ignored when either argument is zero.
    fn page(mut self, page: usize, page_size: usize) -> Self {
        if page < 1 || page_size < 1 {
            return self;
        }
        let provider = self.pagination_provider();
        provider.limit = page_size;
        provider.offset = (page - 1) * page_size;
        self
    }
}

// --- fields ---

#[derive(Debug, Clone, Default)]
pub struct FieldProvider {
    fields: Vec<String>,
}

impl ApplyQuery for FieldProvider {
    fn apply(&self, query: &mut QueryParams) {
        if !self.fields.is_empty() {
            query.set("fields", self.fields.join(","));
        }
    }
}

/// Field selection through the `fields` query parameter.
pub trait FieldSelectable: Sized {
    #[doc(hidden)]
    fn field_provider(&mut self) -> &mut FieldProvider;

    /// Return only these columns. Replaces any earlier selection; when never
    /// called every column is returned.
    fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_provider().fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

// --- shuffle ---

#[derive(Debug, Clone, Default)]
pub struct ShuffleProvider {
    enabled: bool,
}

impl ApplyQuery for ShuffleProvider {
    fn apply(&self, query: &mut QueryParams) {
        if self.enabled {
            query.set("shuffle", "1");
        }
    }
}

pub trait Shuffleable: Sized {
    #[doc(hidden)]
    fn shuffle_provider(&mut self) -> &mut ShuffleProvider;

    /// Return results in random order.
    fn shuffle(mut self) -> Self {
        self.shuffle_provider().enabled = true;
        self
    }
}

// --- view ---

#[derive(Debug, Clone, Default)]
pub struct ViewProvider {
    view_id: Option<String>,
}

impl ApplyQuery for ViewProvider {
    fn apply(&self, query: &mut QueryParams) {
        if let Some(view_id) = &self.view_id {
            query.set("viewId", view_id.clone());
        }
    }
}

/// Restrict results to the records visible in a view.
///
/// Explicit sort parameters take precedence over the view's sort, and
/// `where` filters apply on top of the view's own filters.
pub trait ViewSelectable: Sized {
    #[doc(hidden)]
    fn view_provider(&mut self) -> &mut ViewProvider;

    /// Empty IDs are ignored.
    fn with_view_id(mut self, view_id: impl Into<String>) -> Self {
        let view_id = view_id.into();
        if !view_id.is_empty() {
            self.view_provider().view_id = Some(view_id);
        }
        self
    }
}

// --- timeout ---

/// Per-call timeout, overriding the client default for one `execute`.
pub trait RequestTimeout: Sized {
    #[doc(hidden)]
    fn timeout_slot(&mut self) -> &mut Option<Duration>;

    fn with_timeout(mut self, timeout: Duration) -> Self {
        *self.timeout_slot() = Some(timeout);
        self
    }
}

/// Implement the fluent option traits for a builder by naming the field
/// that holds each provider.
macro_rules! impl_query_options {
    ($builder:ident { $($trait_:ident => $accessor:ident ( $field:ident : $provider:ty )),* $(,)? }) => {
        $(
            impl $crate::query::$trait_ for $builder<'_> {
                fn $accessor(&mut self) -> &mut $provider {
                    &mut self.$field
                }
            }
        )*
    };
}

pub(crate) use impl_query_options;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterGroup;

    #[derive(Default)]
    struct OptionSet {
        filters: FilterProvider,
        sorts: SortProvider,
        pagination: PaginationProvider,
        fields: FieldProvider,
        shuffle: ShuffleProvider,
        view: ViewProvider,
    }

    impl OptionSet {
        fn query(&self) -> QueryParams {
            let mut query = QueryParams::new();
            self.filters.apply(&mut query);
            self.sorts.apply(&mut query);
            self.pagination.apply(&mut query);
            self.fields.apply(&mut query);
            self.shuffle.apply(&mut query);
            self.view.apply(&mut query);
            query
        }
    }

    impl Filterable for OptionSet {
        fn filter_provider(&mut self) -> &mut FilterProvider {
            &mut self.filters
        }
    }
    impl Sortable for OptionSet {
        fn sort_provider(&mut self) -> &mut SortProvider {
            &mut self.sorts
        }
    }
    impl Paginated for OptionSet {
        fn pagination_provider(&mut self) -> &mut PaginationProvider {
            &mut self.pagination
        }
    }
    impl FieldSelectable for OptionSet {
        fn field_provider(&mut self) -> &mut FieldProvider {
            &mut self.fields
        }
    }
    impl Shuffleable for OptionSet {
        fn shuffle_provider(&mut self) -> &mut ShuffleProvider {
            &mut self.shuffle
        }
    }
    impl ViewSelectable for OptionSet {
        fn view_provider(&mut self) -> &mut ViewProvider {
            &mut self.view
        }
    }

    #[test]
    fn empty_builder_produces_empty_query() {
        assert!(OptionSet::default().query().is_empty());
    }

    #[test]
    fn filters_join_with_and() {
        let query = OptionSet::default()
            .where_equal_to("Name", "John")
            .where_greater_than("Age", 18)
            .where_is_not_null("Email")
            .query();
        assert_eq!(
            query.get("where"),
            Some("(Name,eq,John)~and(Age,gt,18)~and(Email,isnot,null)")
        );
    }

    #[test]
    fn compound_raw_filters_are_grouped_before_joining() {
        let query = OptionSet::default()
            .where_expr("(A,eq,1)~or(B,eq,2)")
            .where_equal_to("C", 3)
            .query();
        assert_eq!(query.get("where"), Some("((A,eq,1)~or(B,eq,2))~and(C,eq,3)"));

        let query = OptionSet::default()
            .where_expr("~not(A,eq,1)")
            .where_expr("(B,eq,2)~and(C,eq,3)")
            .query();
        assert_eq!(query.get("where"), Some("~not(A,eq,1)~and((B,eq,2)~and(C,eq,3))"));
    }

    #[test]
    fn within_takes_a_typed_sub_operator() {
        let query = OptionSet::default()
            .where_is_within("Due", DateWithinSubOperator::NextMonth)
            .query();
        assert_eq!(query.get("where"), Some("(Due,isWithin,nextMonth)"));
    }

    #[test]
    fn single_raw_filter_is_sent_verbatim() {
        let query = OptionSet::default().where_expr("(A,eq,1)~or(B,eq,2)").query();
        assert_eq!(query.get("where"), Some("(A,eq,1)~or(B,eq,2)"));
    }

    #[test]
    fn single_term_detection() {
        assert!(is_single_term("(A,eq,1)"));
        assert!(is_single_term("((A,eq,1)~or(B,eq,2))"));
        assert!(is_single_term("~not(A,eq,1)"));
        assert!(!is_single_term("(A,eq,1)~or(B,eq,2)"));
        assert!(!is_single_term("A,eq,1"));
        assert!(!is_single_term("(A,eq,1"));
    }

    #[test]
    fn empty_raw_filter_is_ignored() {
        let query = OptionSet::default().where_expr("").query();
        assert_eq!(query.get("where"), None);
    }

    #[test]
    fn list_filters_without_values_are_ignored() {
        let query = OptionSet::default()
            .where_is_in("Id", Vec::<u64>::new())
            .where_any_of("Tags", Vec::<&str>::new())
            .where_all_of("Tags", ["a", "b"])
            .query();
        assert_eq!(query.get("where"), Some("(Tags,allof,a,b)"));
    }

    #[test]
    fn groups_are_accepted_as_expressions() {
        let group = FilterGroup::or([Filter::is_true("A"), Filter::is_false("B")]);
        let query = OptionSet::default().where_expr(group).where_is_null("C").query();
        assert_eq!(
            query.get("where"),
            Some("((A,is,true)~or(B,is,false))~and(C,is,null)")
        );
    }

    #[test]
    fn sorts_keep_call_order() {
        let query = OptionSet::default()
            .sort_asc_by("Name")
            .sort_desc_by("Age")
            .sort_by(Sort::asc("Id"))
            .query();
        assert_eq!(query.get("sort"), Some("Name,-Age,Id"));
    }

    #[test]
    fn zero_limit_and_offset_are_omitted() {
        let query = OptionSet::default().limit(0).offset(0).query();
        assert_eq!(query.get("limit"), None);
        assert_eq!(query.get("offset"), None);

        let query = OptionSet::default().limit(10).offset(20).query();
        assert_eq!(query.get("limit"), Some("10"));
        assert_eq!(query.get("offset"), Some("20"));
    }

    #[test]
    fn page_converts_to_limit_and_offset() {
        let query = OptionSet::default().page(3, 25).query();
        assert_eq!(query.get("limit"), Some("25"));
        assert_eq!(query.get("offset"), Some("50"));

        let query = OptionSet::default().page(1, 10).query();
        assert_eq!(query.get("limit"), Some("10"));
        assert_eq!(query.get("offset"), None);
    }

    #[test]
    fn invalid_page_is_ignored() {
        let query = OptionSet::default().limit(5).page(0, 10).page(2, 0).query();
        assert_eq!(query.get("limit"), Some("5"));
        assert_eq!(query.get("offset"), None);
    }

    #[test]
    fn return_fields_replaces_selection() {
        let query = OptionSet::default()
            .return_fields(["Name", "Age"])
            .return_fields(["Email"])
            .query();
        assert_eq!(query.get("fields"), Some("Email"));
    }

    #[test]
    fn shuffle_and_view() {
        let query = OptionSet::default().shuffle().with_view_id("vw_1").query();
        assert_eq!(query.get("shuffle"), Some("1"));
        assert_eq!(query.get("viewId"), Some("vw_1"));
    }

    #[test]
    fn empty_view_id_is_ignored() {
        let query = OptionSet::default().with_view_id("vw_1").with_view_id("").query();
        assert_eq!(query.get("viewId"), Some("vw_1"));
    }

    #[test]
    fn query_params_iterate_in_key_order() {
        let query = OptionSet::default().limit(1).sort_asc_by("A").where_is_true("B").query();
        let keys: Vec<&str> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["limit", "sort", "where"]);
    }
}
