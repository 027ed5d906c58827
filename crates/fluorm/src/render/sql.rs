use super::{Capabilities, Dialect, RenderContext, Rendered, Renderer, compound_prefix};
use crate::ast::{
    AggFunc, Ast, BinaryOp, Bound, CompoundAst, Cond, Conflict, DeleteAst, Direction, Field,
    InsertAst, NullsOrder, OrderItem, ScalarExpr, SelectAst, SelectItem, UpdateAst, Window,
};
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_ident;

/// Renderer for Postgres-protocol dialects.
#[derive(Debug, Clone)]
pub struct SqlRenderer {
    dialect: Dialect,
    caps: Capabilities,
}

impl SqlRenderer {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            caps: dialect.capabilities(),
        }
    }

    pub fn postgres() -> Self {
        Self::new(Dialect::Postgres)
    }

    pub fn redshift() -> Self {
        Self::new(Dialect::Redshift)
    }

    /// Override the dialect's capability flags.
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn unsupported(&self, what: &str) -> OrmError {
        let dialect = self.dialect.name();
        OrmError::render(format!("{what} is not supported by {dialect}"))
    }

    fn select(&self, q: &SelectAst, ctx: &mut RenderContext) -> OrmResult<()> {
        ctx.write("SELECT ");
        if q.distinct {
            ctx.write("DISTINCT ");
        }
        if q.items.is_empty() {
            ctx.write("*");
        }
        for (i, item) in q.items.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            self.select_item(item, ctx)?;
        }
        ctx.write(" FROM ");
        ctx.write(&quote_ident(q.table.name()));
        self.where_clause(&q.where_, ctx)?;
        if !q.group_by.is_empty() {
            ctx.write(" GROUP BY ");
            self.fields(&q.group_by, ctx);
        }
        if !q.having.is_empty() {
            ctx.write(" HAVING ");
            self.conjunction(&q.having, ctx)?;
        }
        self.tail(&q.order_by, q.limit.as_ref(), q.offset.as_ref(), ctx)?;
        if let Some(lock) = q.lock {
            if !self.caps.row_locking {
                return Err(self.unsupported("row locking"));
            }
            ctx.write(" ");
            ctx.write(lock.as_sql());
        }
        Ok(())
    }

    fn insert(&self, q: &InsertAst, ctx: &mut RenderContext) -> OrmResult<()> {
        if q.rows.is_empty() {
            return Err(OrmError::render("INSERT without any VALUES row"));
        }
        ctx.write("INSERT INTO ");
        ctx.write(&quote_ident(q.table.name()));
        ctx.write(" (");
        self.fields(&q.columns, ctx);
        ctx.write(") VALUES ");
        for (i, row) in q.rows.iter().enumerate() {
            if row.len() != q.columns.len() {
                return Err(OrmError::render(format!(
                    "VALUES row {i} has {} values for {} columns",
                    row.len(),
                    q.columns.len()
                )));
            }
            if i > 0 {
                ctx.write(", ");
            }
            ctx.write("(");
            for (j, param) in row.iter().enumerate() {
                if j > 0 {
                    ctx.write(", ");
                }
                ctx.push_param(param.name());
            }
            ctx.write(")");
        }
        if let Some(conflict) = &q.conflict {
            if !self.caps.upsert {
                return Err(self.unsupported("ON CONFLICT"));
            }
            ctx.write(" ON CONFLICT");
            let target = conflict.target();
            if !target.is_empty() {
                ctx.write(" (");
                self.fields(target, ctx);
                ctx.write(")");
            }
            match conflict {
                Conflict::DoNothing { .. } => ctx.write(" DO NOTHING"),
                Conflict::DoUpdate { target, set } => {
                    if target.is_empty() || set.is_empty() {
                        return Err(OrmError::render(
                            "ON CONFLICT DO UPDATE needs a target and at least one column",
                        ));
                    }
                    ctx.write(" DO UPDATE SET ");
                    for (i, f) in set.iter().enumerate() {
                        if i > 0 {
                            ctx.write(", ");
                        }
                        let col = quote_ident(f.name());
                        ctx.write(&format!("{col} = EXCLUDED.{col}"));
                    }
                }
            }
        }
        if !q.returning.is_empty() {
            if !self.caps.returning_on_insert {
                return Err(self.unsupported("INSERT .. RETURNING"));
            }
            self.returning(&q.returning, ctx);
        }
        Ok(())
    }

    fn update(&self, q: &UpdateAst, ctx: &mut RenderContext) -> OrmResult<()> {
        if q.set.is_empty() {
            return Err(OrmError::render("UPDATE without any SET column"));
        }
        ctx.write("UPDATE ");
        ctx.write(&quote_ident(q.table.name()));
        ctx.write(" SET ");
        for (i, (field, param)) in q.set.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            ctx.write(&quote_ident(field.name()));
            ctx.write(" = ");
            ctx.push_param(param.name());
        }
        self.where_clause(&q.where_, ctx)?;
        if !q.returning.is_empty() {
            if !self.caps.returning_on_update {
                return Err(self.unsupported("UPDATE .. RETURNING"));
            }
            self.returning(&q.returning, ctx);
        }
        Ok(())
    }

    fn delete(&self, q: &DeleteAst, ctx: &mut RenderContext) -> OrmResult<()> {
        ctx.write("DELETE FROM ");
        ctx.write(&quote_ident(q.table.name()));
        self.where_clause(&q.where_, ctx)
    }

    fn compound(&self, q: &CompoundAst, ctx: &mut RenderContext) -> OrmResult<()> {
        for (i, part) in q.parts().enumerate() {
            if part.lock.is_some() {
                return Err(OrmError::render("row locking is not allowed inside a compound query"));
            }
            if i > 0 {
                ctx.write(" ");
                ctx.write(q.rest[i - 1].0.as_sql());
                ctx.write(" ");
            }
            let outer = ctx.set_prefix(Some(compound_prefix(i)));
            ctx.write("(");
            let res = self.select(part, ctx);
            ctx.write(")");
            ctx.set_prefix(outer);
            res?;
        }
        self.tail(&q.order_by, q.limit.as_ref(), q.offset.as_ref(), ctx)
    }

    fn tail(
        &self,
        order_by: &[OrderItem],
        limit: Option<&Bound>,
        offset: Option<&Bound>,
        ctx: &mut RenderContext,
    ) -> OrmResult<()> {
        if !order_by.is_empty() {
            ctx.write(" ORDER BY ");
            self.order_items(order_by, ctx)?;
        }
        if let Some(limit) = limit {
            ctx.write(" LIMIT ");
            self.bound(limit, ctx);
        }
        if let Some(offset) = offset {
            ctx.write(" OFFSET ");
            self.bound(offset, ctx);
        }
        Ok(())
    }

    fn bound(&self, b: &Bound, ctx: &mut RenderContext) {
        match b {
            Bound::Literal(n) => ctx.write(&n.to_string()),
            Bound::Param(p) => ctx.push_param(p.name()),
        }
    }

    fn fields(&self, fields: &[Field], ctx: &mut RenderContext) {
        let list = fields
            .iter()
            .map(|f| quote_ident(f.name()))
            .collect::<Vec<_>>()
            .join(", ");
        ctx.write(&list);
    }

    fn returning(&self, fields: &[Field], ctx: &mut RenderContext) {
        ctx.write(" RETURNING ");
        self.fields(fields, ctx);
    }

    fn where_clause(&self, conds: &[Cond], ctx: &mut RenderContext) -> OrmResult<()> {
        if conds.is_empty() {
            return Ok(());
        }
        ctx.write(" WHERE ");
        self.conjunction(conds, ctx)
    }

    fn conjunction(&self, conds: &[Cond], ctx: &mut RenderContext) -> OrmResult<()> {
        for (i, c) in conds.iter().enumerate() {
            if i > 0 {
                ctx.write(" AND ");
            }
            self.cond(c, ctx)?;
        }
        Ok(())
    }

    fn check_op(&self, op: BinaryOp) -> OrmResult<()> {
        if op.is_vector() && !self.caps.vector_ops {
            return Err(self.unsupported(&format!("operator {}", op.as_sql())));
        }
        if op.is_membership() && !self.caps.array_params {
            return Err(self.unsupported(&format!("{} with an array parameter", op.as_sql())));
        }
        Ok(())
    }

    fn compare_param(&self, op: BinaryOp, param: &str, ctx: &mut RenderContext) -> OrmResult<()> {
        self.check_op(op)?;
        match op {
            BinaryOp::In => {
                ctx.write(" = ANY(");
                ctx.push_param(param);
                ctx.write(")");
            }
            BinaryOp::NotIn => {
                ctx.write(" <> ALL(");
                ctx.push_param(param);
                ctx.write(")");
            }
            _ => {
                ctx.write(" ");
                ctx.write(op.as_sql());
                ctx.write(" ");
                ctx.push_param(param);
            }
        }
        Ok(())
    }

    fn cond(&self, c: &Cond, ctx: &mut RenderContext) -> OrmResult<()> {
        match c {
            Cond::Compare { field, op, param } => {
                ctx.write(&quote_ident(field.name()));
                self.compare_param(*op, param.name(), ctx)?;
            }
            Cond::FieldCompare { left, op, right } => {
                if op.is_membership() {
                    return Err(OrmError::render(format!(
                        "{} cannot compare two columns",
                        op.as_sql()
                    )));
                }
                self.check_op(*op)?;
                ctx.write(&format!(
                    "{} {} {}",
                    quote_ident(left.name()),
                    op.as_sql(),
                    quote_ident(right.name())
                ));
            }
            Cond::Null { field, negated } => {
                ctx.write(&quote_ident(field.name()));
                ctx.write(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Cond::NullSafeEq { field, param } => {
                let column = quote_ident(field.name());
                ctx.write(&format!("({column} = "));
                ctx.push_param(param.name());
                ctx.write(&format!(" OR ({column} IS NULL AND "));
                ctx.push_param(param.name());
                ctx.write(" IS NULL))");
            }
            Cond::Between {
                field,
                low,
                high,
                negated,
            } => {
                ctx.write(&quote_ident(field.name()));
                if *negated {
                    ctx.write(" NOT");
                }
                ctx.write(" BETWEEN ");
                ctx.push_param(low.name());
                ctx.write(" AND ");
                ctx.push_param(high.name());
            }
            Cond::Aggregate {
                func,
                field,
                op,
                param,
            } => {
                self.aggregate_call(*func, field.as_ref(), ctx)?;
                self.compare_param(*op, param.name(), ctx)?;
            }
            Cond::Group { logic, conds } => {
                if conds.is_empty() {
                    return Err(OrmError::render("empty condition group"));
                }
                ctx.write("(");
                for (i, member) in conds.iter().enumerate() {
                    if i > 0 {
                        ctx.write(logic.as_sql());
                    }
                    self.cond(member, ctx)?;
                }
                ctx.write(")");
            }
        }
        Ok(())
    }

    fn aggregate_call(
        &self,
        func: AggFunc,
        field: Option<&Field>,
        ctx: &mut RenderContext,
    ) -> OrmResult<()> {
        match field {
            Some(f) => {
                let arg = ScalarExpr::Column(f.clone());
                self.aggregate_expr(func, Some(&arg), ctx)
            }
            None => self.aggregate_expr(func, None, ctx),
        }
    }

    fn aggregate_expr(
        &self,
        func: AggFunc,
        arg: Option<&ScalarExpr>,
        ctx: &mut RenderContext,
    ) -> OrmResult<()> {
        ctx.write(func.sql_name());
        ctx.write("(");
        match arg {
            Some(arg) => {
                if func == AggFunc::CountDistinct {
                    ctx.write("DISTINCT ");
                }
                self.expr(arg, ctx)?;
            }
            None if func == AggFunc::Count => ctx.write("*"),
            None => {
                return Err(OrmError::render(format!("{} needs an argument", func.sql_name())));
            }
        }
        ctx.write(")");
        Ok(())
    }

    fn expr(&self, e: &ScalarExpr, ctx: &mut RenderContext) -> OrmResult<()> {
        match e {
            ScalarExpr::Column(f) => ctx.write(&quote_ident(f.name())),
            ScalarExpr::Param(p) => ctx.push_param(p.name()),
            ScalarExpr::Func { func, args } => {
                ctx.write(func.sql_name());
                ctx.write("(");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        ctx.write(", ");
                    }
                    self.expr(a, ctx)?;
                }
                ctx.write(")");
            }
            ScalarExpr::Cast { expr, ty } => {
                ctx.write("CAST(");
                self.expr(expr, ctx)?;
                ctx.write(" AS ");
                ctx.write(ty.as_sql());
                ctx.write(")");
            }
            ScalarExpr::Binary { left, op, right } => {
                if op.is_membership() {
                    return Err(OrmError::render(format!(
                        "{} is not a scalar operator",
                        op.as_sql()
                    )));
                }
                self.check_op(*op)?;
                ctx.write("(");
                self.expr(left, ctx)?;
                ctx.write(" ");
                ctx.write(op.as_sql());
                ctx.write(" ");
                self.expr(right, ctx)?;
                ctx.write(")");
            }
            ScalarExpr::Aggregate {
                func,
                arg,
                filter,
                over,
            } => {
                self.aggregate_expr(*func, arg.as_deref(), ctx)?;
                if let Some(filter) = filter {
                    if !self.caps.aggregate_filter {
                        return Err(self.unsupported("aggregate FILTER"));
                    }
                    ctx.write(" FILTER (WHERE ");
                    self.cond(filter, ctx)?;
                    ctx.write(")");
                }
                if let Some(window) = over {
                    self.over(window, ctx)?;
                }
            }
            ScalarExpr::Case { whens, otherwise } => {
                if whens.is_empty() {
                    return Err(OrmError::render("CASE without any WHEN branch"));
                }
                ctx.write("CASE");
                for (cond, then) in whens {
                    ctx.write(" WHEN ");
                    self.cond(cond, ctx)?;
                    ctx.write(" THEN ");
                    self.expr(then, ctx)?;
                }
                if let Some(otherwise) = otherwise {
                    ctx.write(" ELSE ");
                    self.expr(otherwise, ctx)?;
                }
                ctx.write(" END");
            }
            ScalarExpr::Window { func, over } => {
                ctx.write(func.sql_name());
                ctx.write("()");
                self.over(over, ctx)?;
            }
        }
        Ok(())
    }

    fn over(&self, w: &Window, ctx: &mut RenderContext) -> OrmResult<()> {
        if !self.caps.window_functions {
            return Err(self.unsupported("window functions"));
        }
        ctx.write(" OVER (");
        if !w.partition_by.is_empty() {
            ctx.write("PARTITION BY ");
            self.fields(&w.partition_by, ctx);
        }
        if !w.order_by.is_empty() {
            if !w.partition_by.is_empty() {
                ctx.write(" ");
            }
            ctx.write("ORDER BY ");
            self.order_items(&w.order_by, ctx)?;
        }
        ctx.write(")");
        Ok(())
    }

    fn select_item(&self, item: &SelectItem, ctx: &mut RenderContext) -> OrmResult<()> {
        self.expr(&item.expr, ctx)?;
        if let Some(alias) = &item.alias {
            ctx.write(" AS ");
            ctx.write(&quote_ident(alias));
        }
        Ok(())
    }

    fn order_items(&self, items: &[OrderItem], ctx: &mut RenderContext) -> OrmResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            self.expr(&item.expr, ctx)?;
            ctx.write(match item.direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
            if let Some(nulls) = item.nulls {
                if !self.caps.nulls_ordering {
                    return Err(self.unsupported("NULLS FIRST/LAST"));
                }
                ctx.write(match nulls {
                    NullsOrder::First => " NULLS FIRST",
                    NullsOrder::Last => " NULLS LAST",
                });
            }
        }
        Ok(())
    }
}

impl Renderer for SqlRenderer {
    fn render(&self, ast: &Ast) -> OrmResult<Rendered> {
        let mut ctx = RenderContext::new();
        match ast {
            Ast::Select(q) => self.select(q, &mut ctx)?,
            Ast::Insert(q) => self.insert(q, &mut ctx)?,
            Ast::Update(q) => self.update(q, &mut ctx)?,
            Ast::Delete(q) => self.delete(q, &mut ctx)?,
            Ast::Compound(q) => self.compound(q, &mut ctx)?,
        }
        Ok(ctx.finish())
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }
}
