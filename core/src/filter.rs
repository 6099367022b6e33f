//! Filter expressions for the `where` query parameter.
//!
//! NocoDB filters are written as `(column,operator,value)` triples combined
//! with the logical connectives `~and`, `~or` and `~not`:
//!
//! ```text
//! (Check,eq,55)~or((Amount,gt,10)~and(Amount,lt,20))
//! ```
//!
//! Rendering is plain formatting. Values are written verbatim; nothing is
//! escaped, parsed or validated, so a value containing `,` or `)` changes the
//! meaning of the expression on the server side.

use std::fmt;
use std::str::FromStr;

/// Comparison operator of a single filter triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Is,
    IsNot,
    In,
    Between,
    NotBetween,
    Like,
    NotLike,
    IsWithin,
    AllOf,
    AnyOf,
    NotAllOf,
    NotAnyOf,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 18] = [
        ComparisonOperator::Equal,
        ComparisonOperator::NotEqual,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqual,
        ComparisonOperator::LessThan,
        ComparisonOperator::LessThanOrEqual,
        ComparisonOperator::Is,
        ComparisonOperator::IsNot,
        ComparisonOperator::In,
        ComparisonOperator::Between,
        ComparisonOperator::NotBetween,
        ComparisonOperator::Like,
        ComparisonOperator::NotLike,
        ComparisonOperator::IsWithin,
        ComparisonOperator::AllOf,
        ComparisonOperator::AnyOf,
        ComparisonOperator::NotAllOf,
        ComparisonOperator::NotAnyOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "eq",
            ComparisonOperator::NotEqual => "neq",
            ComparisonOperator::GreaterThan => "gt",
            ComparisonOperator::GreaterThanOrEqual => "ge",
            ComparisonOperator::LessThan => "lt",
            ComparisonOperator::LessThanOrEqual => "le",
            ComparisonOperator::Is => "is",
            ComparisonOperator::IsNot => "isnot",
            ComparisonOperator::In => "in",
            ComparisonOperator::Between => "btw",
            ComparisonOperator::NotBetween => "nbtw",
            ComparisonOperator::Like => "like",
            ComparisonOperator::NotLike => "nlike",
            ComparisonOperator::IsWithin => "isWithin",
            ComparisonOperator::AllOf => "allof",
            ComparisonOperator::AnyOf => "anyof",
            ComparisonOperator::NotAllOf => "nallof",
            ComparisonOperator::NotAnyOf => "nanyof",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known wire operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown comparison operator {0:?}")]
pub struct UnknownOperator(pub String);

impl FromStr for ComparisonOperator {
    type Err = UnknownOperator;

    /// Parse the wire form, e.g. `"ge"` or `"isWithin"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComparisonOperator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// Connective joining the members of a `FilterGroup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "~and",
            LogicalOperator::Or => "~or",
            LogicalOperator::Not => "~not",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-operator for comparing Date/DateTime columns with `eq`, `lt`, ...
///
/// `DaysAgo`, `DaysFromNow` and `ExactDate` take one extra value, e.g.
/// `(Created,gt,daysAgo,10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSubOperator {
    Today,
    Tomorrow,
    Yesterday,
    OneWeekAgo,
    OneWeekFromNow,
    OneMonthAgo,
    OneMonthFromNow,
    DaysAgo,
    DaysFromNow,
    ExactDate,
}

impl DateSubOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            DateSubOperator::Today => "today",
            DateSubOperator::Tomorrow => "tomorrow",
            DateSubOperator::Yesterday => "yesterday",
            DateSubOperator::OneWeekAgo => "oneWeekAgo",
            DateSubOperator::OneWeekFromNow => "oneWeekFromNow",
            DateSubOperator::OneMonthAgo => "oneMonthAgo",
            DateSubOperator::OneMonthFromNow => "oneMonthFromNow",
            DateSubOperator::DaysAgo => "daysAgo",
            DateSubOperator::DaysFromNow => "daysFromNow",
            DateSubOperator::ExactDate => "exactDate",
        }
    }
}

impl fmt::Display for DateSubOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-operator for the `isWithin` comparison.
///
/// `NextNumberOfDays` and `PastNumberOfDays` take the day count as an extra
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWithinSubOperator {
    PastWeek,
    PastMonth,
    PastYear,
    NextWeek,
    NextMonth,
    NextYear,
    NextNumberOfDays,
    PastNumberOfDays,
}

impl DateWithinSubOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            DateWithinSubOperator::PastWeek => "pastWeek",
            DateWithinSubOperator::PastMonth => "pastMonth",
            DateWithinSubOperator::PastYear => "pastYear",
            DateWithinSubOperator::NextWeek => "nextWeek",
            DateWithinSubOperator::NextMonth => "nextMonth",
            DateWithinSubOperator::NextYear => "nextYear",
            DateWithinSubOperator::NextNumberOfDays => "nextNumberOfDays",
            DateWithinSubOperator::PastNumberOfDays => "pastNumberOfDays",
        }
    }
}

impl fmt::Display for DateWithinSubOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(column,operator,value...)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: ComparisonOperator,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, V>(column: impl Into<String>, operator: ComparisonOperator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self {
            column: column.into(),
            operator,
            values: values.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn equal_to(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::Equal, [value])
    }

    pub fn not_equal_to(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::NotEqual, [value])
    }

    pub fn greater_than(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::GreaterThan, [value])
    }

    pub fn greater_than_or_equal(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::GreaterThanOrEqual, [value])
    }

    pub fn less_than(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::LessThan, [value])
    }

    pub fn less_than_or_equal(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::LessThanOrEqual, [value])
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOperator::Is, ["null"])
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOperator::IsNot, ["null"])
    }

    pub fn is_true(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOperator::Is, ["true"])
    }

    pub fn is_false(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOperator::Is, ["false"])
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(column, ComparisonOperator::In, values)
    }

    /// Inclusive range.
    pub fn between(column: impl Into<String>, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            column,
            ComparisonOperator::Between,
            [min.to_string(), max.to_string()],
        )
    }

    pub fn not_between(column: impl Into<String>, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            column,
            ComparisonOperator::NotBetween,
            [min.to_string(), max.to_string()],
        )
    }

    /// `%` matches any sequence of characters.
    pub fn like(column: impl Into<String>, pattern: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::Like, [pattern])
    }

    pub fn not_like(column: impl Into<String>, pattern: impl fmt::Display) -> Self {
        Self::new(column, ComparisonOperator::NotLike, [pattern])
    }

    /// Date/DateTime range check, e.g. `Filter::within("Due", DateWithinSubOperator::PastWeek)`.
    pub fn within(column: impl Into<String>, sub_operator: DateWithinSubOperator) -> Self {
        Self::new(column, ComparisonOperator::IsWithin, [sub_operator])
    }

    /// `isWithin` with a day count, for `nextNumberOfDays` / `pastNumberOfDays`.
    pub fn within_days(column: impl Into<String>, sub_operator: DateWithinSubOperator, days: u32) -> Self {
        Self::new(
            column,
            ComparisonOperator::IsWithin,
            [sub_operator.to_string(), days.to_string()],
        )
    }

    /// Compare a date column against a relative or exact date,
    /// e.g. `(Created,lt,daysAgo,10)`.
    pub fn date(
        column: impl Into<String>,
        operator: ComparisonOperator,
        sub_operator: DateSubOperator,
        value: Option<&str>,
    ) -> Self {
        let mut values = vec![sub_operator.to_string()];
        values.extend(value.map(str::to_string));
        Self::new(column, operator, values)
    }

    pub fn all_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(column, ComparisonOperator::AllOf, values)
    }

    pub fn any_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(column, ComparisonOperator::AnyOf, values)
    }

    pub fn not_all_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(column, ComparisonOperator::NotAllOf, values)
    }

    pub fn not_any_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        Self::new(column, ComparisonOperator::NotAnyOf, values)
    }

    pub fn and(self, other: impl Into<FilterExpr>) -> FilterGroup {
        FilterGroup::and([FilterExpr::from(self), other.into()])
    }

    pub fn or(self, other: impl Into<FilterExpr>) -> FilterGroup {
        FilterGroup::or([FilterExpr::from(self), other.into()])
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.column, self.operator, self.values.join(","))
    }
}

/// Either side of a logical connective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Filter(Filter),
    Group(FilterGroup),
}

impl From<Filter> for FilterExpr {
    fn from(filter: Filter) -> Self {
        FilterExpr::Filter(filter)
    }
}

impl From<FilterGroup> for FilterExpr {
    fn from(group: FilterGroup) -> Self {
        FilterExpr::Group(group)
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Filter(filter) => fmt::Display::fmt(filter, f),
            FilterExpr::Group(group) => fmt::Display::fmt(group, f),
        }
    }
}

/// Filters and nested groups joined by one logical operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGroup {
    pub operator: LogicalOperator,
    pub members: Vec<FilterExpr>,
}

impl FilterGroup {
    pub fn new<I, E>(operator: LogicalOperator, members: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<FilterExpr>,
    {
        Self {
            operator,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and<I, E>(members: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<FilterExpr>,
    {
        Self::new(LogicalOperator::And, members)
    }

    pub fn or<I, E>(members: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<FilterExpr>,
    {
        Self::new(LogicalOperator::Or, members)
    }

    /// Negates a single expression: `~not(Status,eq,done)`.
    pub fn not(member: impl Into<FilterExpr>) -> Self {
        Self::new(LogicalOperator::Not, [member.into()])
    }

    pub fn push(&mut self, member: impl Into<FilterExpr>) -> &mut Self {
        self.members.push(member.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == LogicalOperator::Not {
            // Several members are negated as one conjunction.
            return match self.members.as_slice() {
                [] => Ok(()),
                [only] => write!(f, "{}{only}", self.operator),
                [first, rest @ ..] => {
                    write!(f, "{}({first}", self.operator)?;
                    for member in rest {
                        write!(f, "{}{member}", LogicalOperator::And)?;
                    }
                    f.write_str(")")
                }
            };
        }

        match self.members.as_slice() {
            [] => Ok(()),
            [only] => fmt::Display::fmt(only, f),
            [first, rest @ ..] => {
                write!(f, "({first}")?;
                for member in rest {
                    write!(f, "{}{member}", self.operator)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_filters() {
        assert_eq!(Filter::equal_to("Name", "foo").to_string(), "(Name,eq,foo)");
        assert_eq!(Filter::not_equal_to("Name", "foo").to_string(), "(Name,neq,foo)");
        assert_eq!(Filter::greater_than("Age", 18).to_string(), "(Age,gt,18)");
        assert_eq!(Filter::greater_than_or_equal("Age", 18).to_string(), "(Age,ge,18)");
        assert_eq!(Filter::less_than("Age", 30).to_string(), "(Age,lt,30)");
        assert_eq!(Filter::less_than_or_equal("Age", 30).to_string(), "(Age,le,30)");
        assert_eq!(Filter::like("Email", "%@example.com").to_string(), "(Email,like,%@example.com)");
        assert_eq!(Filter::not_like("Email", "Foo%").to_string(), "(Email,nlike,Foo%)");
    }

    #[test]
    fn operators_parse_from_wire_form() {
        for op in ComparisonOperator::ALL {
            assert_eq!(op.as_str().parse::<ComparisonOperator>(), Ok(op));
        }
        assert_eq!(
            "within".parse::<ComparisonOperator>(),
            Err(UnknownOperator("within".to_string()))
        );
    }

    #[test]
    fn null_and_boolean_filters() {
        assert_eq!(Filter::is_null("Deleted").to_string(), "(Deleted,is,null)");
        assert_eq!(Filter::is_not_null("Deleted").to_string(), "(Deleted,isnot,null)");
        assert_eq!(Filter::is_true("Active").to_string(), "(Active,is,true)");
        assert_eq!(Filter::is_false("Active").to_string(), "(Active,is,false)");
    }

    #[test]
    fn multi_value_filters_join_with_commas() {
        assert_eq!(Filter::is_in("Id", [1, 2, 3]).to_string(), "(Id,in,1,2,3)");
        assert_eq!(Filter::between("Age", 18, 30).to_string(), "(Age,btw,18,30)");
        assert_eq!(Filter::not_between("Age", 18, 30).to_string(), "(Age,nbtw,18,30)");
        assert_eq!(Filter::all_of("Tags", ["a", "b"]).to_string(), "(Tags,allof,a,b)");
        assert_eq!(Filter::any_of("Tags", ["a", "b"]).to_string(), "(Tags,anyof,a,b)");
        assert_eq!(Filter::not_all_of("Tags", ["a"]).to_string(), "(Tags,nallof,a)");
        assert_eq!(Filter::not_any_of("Tags", ["a"]).to_string(), "(Tags,nanyof,a)");
    }

    #[test]
    fn date_filters() {
        assert_eq!(
            Filter::within("Due", DateWithinSubOperator::PastWeek).to_string(),
            "(Due,isWithin,pastWeek)"
        );
        assert_eq!(
            Filter::within_days("Due", DateWithinSubOperator::NextNumberOfDays, 5).to_string(),
            "(Due,isWithin,nextNumberOfDays,5)"
        );
        assert_eq!(
            Filter::date("Created", ComparisonOperator::LessThan, DateSubOperator::DaysAgo, Some("10"))
                .to_string(),
            "(Created,lt,daysAgo,10)"
        );
        assert_eq!(
            Filter::date("Created", ComparisonOperator::Equal, DateSubOperator::Today, None).to_string(),
            "(Created,eq,today)"
        );
    }

    #[test]
    fn not_with_several_members_negates_their_conjunction() {
        let mut group = FilterGroup::not(Filter::equal_to("A", 1));
        group.push(Filter::equal_to("B", 2));
        assert_eq!(group.to_string(), "~not((A,eq,1)~and(B,eq,2))");

        let group = FilterGroup::new(
            LogicalOperator::Not,
            [Filter::is_true("A"), Filter::is_true("B"), Filter::is_null("C")],
        );
        assert_eq!(group.to_string(), "~not((A,is,true)~and(B,is,true)~and(C,is,null))");

        assert_eq!(FilterGroup::new(LogicalOperator::Not, Vec::<Filter>::new()).to_string(), "");
    }

    #[test]
    fn groups_nest_without_spaces() {
        let amount = FilterGroup::and([
            Filter::greater_than("Amount", 10),
            Filter::less_than("Amount", 20),
        ]);
        let expr = Filter::equal_to("Check", 55).or(amount);
        assert_eq!(
            expr.to_string(),
            "((Check,eq,55)~or((Amount,gt,10)~and(Amount,lt,20)))"
        );
    }

    #[test]
    fn single_member_group_renders_member() {
        let group = FilterGroup::or([Filter::is_true("Active")]);
        assert_eq!(group.to_string(), "(Active,is,true)");
        assert_eq!(FilterGroup::and(Vec::<Filter>::new()).to_string(), "");
    }

    #[test]
    fn not_group_prefixes_member() {
        let group = FilterGroup::not(Filter::equal_to("Status", "done"));
        assert_eq!(group.to_string(), "~not(Status,eq,done)");
    }

    #[test]
    fn push_extends_group() {
        let mut group = FilterGroup::and([Filter::is_not_null("Name")]);
        group.push(Filter::greater_than("Age", 1));
        assert_eq!(group.to_string(), "((Name,isnot,null)~and(Age,gt,1))");
    }
}
