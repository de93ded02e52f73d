//! Grid query builder using SeaQuery.
//!
//! Renders a [`QueryDescription`] into PostgreSQL:
//! - row SELECT with projection aliases, joins, ordering, and page bound
//! - COUNT over the same scope, search, and filters

use sea_query::{
    Alias, Asterisk, Cond, Expr, Func, JoinType, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr,
};

use super::registry::{
    BASE_ALIAS, BASE_TABLE, Comparison, Field, FieldSource, Join, push_joins, searchable_fields,
};
use super::types::{FilterClause, FilterValue, QueryDescription, SortDirection};

/// Query builder for grid queries.
pub struct GridQueryBuilder<'a> {
    description: &'a QueryDescription,
}

impl<'a> GridQueryBuilder<'a> {
    pub fn new(description: &'a QueryDescription) -> Self {
        Self { description }
    }

    /// Build the row SELECT, bounded by the description's page window if any.
    pub fn build(&self) -> String {
        let mut query = Query::select();

        // SELECT projected fields and their companions under their wire names
        for field in self.description.projection.selected() {
            query.expr_as(field_expr(field), Alias::new(field.name()));
        }

        query.from_as(Alias::new(BASE_TABLE), Alias::new(BASE_ALIAS));
        self.add_joins(&mut query, &self.row_joins());
        self.add_conditions(&mut query);

        // ORDER BY sort key, then tie-break
        for (field, direction) in self.description.sort.keys() {
            let order = match direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by_expr(field_expr(field), order);
        }

        if let Some(window) = self.description.page {
            query.limit(u64::from(window.limit));
            query.offset(window.offset);
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT over the same scope, search, and filters.
    ///
    /// Projection, ordering, and page bound do not affect the count, so only
    /// joins needed by filters are kept.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from_as(Alias::new(BASE_TABLE), Alias::new(BASE_ALIAS));
        self.add_joins(&mut query, &self.filter_joins());
        self.add_conditions(&mut query);

        query.to_string(PostgresQueryBuilder)
    }

    /// Joins needed by projection, filters, and sort, deduplicated.
    fn row_joins(&self) -> Vec<Join> {
        let mut joins = self.description.projection.joins.clone();
        for (field, _) in self.description.sort.keys() {
            push_joins(&mut joins, field.descriptor().joins);
        }
        push_joins(&mut joins, &self.filter_joins());
        joins
    }

    fn filter_joins(&self) -> Vec<Join> {
        let mut joins = Vec::new();
        for clause in &self.description.filters {
            push_joins(&mut joins, clause.field.descriptor().joins);
        }
        joins
    }

    fn add_joins(&self, query: &mut SelectStatement, joins: &[Join]) {
        for join in joins {
            let spec = join.spec();
            let on_condition = Expr::col((Alias::new(spec.local.0), Alias::new(spec.local.1)))
                .equals((Alias::new(spec.alias), Alias::new(spec.foreign_column)));

            query.join_as(
                JoinType::LeftJoin,
                Alias::new(spec.table),
                Alias::new(spec.alias),
                on_condition,
            );
        }
    }

    /// Base scope, free-text search, and filters, all ANDed.
    fn add_conditions(&self, query: &mut SelectStatement) {
        let scope = &self.description.base_scope;
        query.and_where(
            Expr::col((Alias::new(BASE_ALIAS), Alias::new("operation_type")))
                .eq(scope.operation_type.as_str()),
        );
        if scope.exclude_deleted {
            query.and_where(
                Expr::col((Alias::new(BASE_ALIAS), Alias::new("deleted_at"))).is_null(),
            );
        }

        if let Some(term) = &self.description.search_term {
            let pattern = contains_pattern(term);
            let mut any = Cond::any();
            for field in searchable_fields() {
                any = any.add(lower(field).like(pattern.clone()));
            }
            query.cond_where(any);
        }

        for clause in &self.description.filters {
            query.and_where(filter_condition(clause));
        }
    }

    /// Render the description as SQL for logging.
    pub fn describe(&self) -> String {
        format!("{}; {}", self.build(), self.build_count())
    }
}

/// SQL expression producing a field's value.
fn field_expr(field: Field) -> SimpleExpr {
    match field.descriptor().source {
        FieldSource::Column { table, column } => {
            Expr::col((Alias::new(table), Alias::new(column))).into()
        }
        FieldSource::Computed { sql } => Expr::cust(sql),
    }
}

fn lower(field: Field) -> Expr {
    Expr::expr(Func::lower(field_expr(field)))
}

/// Build the predicate for one filter clause.
fn filter_condition(clause: &FilterClause) -> SimpleExpr {
    let field = clause.field;
    let column = || Expr::expr(field_expr(field));

    match &clause.value {
        FilterValue::Text(text) => match field.descriptor().comparison {
            Comparison::Equals => lower(field).eq(text.to_lowercase()),
            Comparison::Contains => lower(field).like(contains_pattern(text)),
        },
        FilterValue::Enum(value) => column().eq(value.as_str()),
        FilterValue::Number(n) => column().eq(*n),
        FilterValue::NumberRange(from, to) => column().gte(*from).and(column().lte(*to)),
        FilterValue::Date(day) => day_range(column, *day, *day),
        FilterValue::DateRange(from, to) => day_range(column, *from, *to),
    }
}

/// Whole-day inclusive range: `>= from AND < to + 1 day`.
fn day_range(
    column: impl Fn() -> Expr,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
) -> SimpleExpr {
    let lower_bound = column().gte(from);
    match to.succ_opt() {
        Some(next) => lower_bound.and(column().lt(next)),
        None => lower_bound,
    }
}

/// Lower-cased `%value%` pattern with LIKE wildcards escaped.
fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like_wildcards(&value.to_lowercase()))
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
