use super::*;
use crate::ast::*;

fn f(name: &str) -> Field {
    Field::new(name)
}

fn p(name: &str) -> ParamRef {
    ParamRef::new(name)
}

fn users() -> SelectAst {
    let mut q = SelectAst::new(TableRef::new("users"));
    q.items = vec![SelectItem::column(f("id")), SelectItem::column(f("email"))];
    q
}

fn render(ast: impl Into<Ast>) -> Rendered {
    SqlRenderer::postgres().render(&ast.into()).unwrap()
}

#[test]
fn select_with_where_order_and_limit() {
    let mut q = users();
    q.where_.push(Cond::Compare {
        field: f("age"),
        op: BinaryOp::Ge,
        param: p("min_age"),
    });
    q.order_by.push(OrderItem {
        expr: ScalarExpr::Column(f("email")),
        direction: Direction::Desc,
        nulls: Some(NullsOrder::Last),
    });
    q.limit = Some(Bound::Literal(10));
    q.offset = Some(Bound::Param(p("skip")));

    let r = render(q);
    assert_eq!(
        r.sql,
        "SELECT \"id\", \"email\" FROM \"users\" WHERE \"age\" >= $1 \
         ORDER BY \"email\" DESC NULLS LAST LIMIT 10 OFFSET $2"
    );
    assert_eq!(r.params, vec!["min_age", "skip"]);
}

#[test]
fn repeated_param_shares_one_placeholder() {
    let mut q = users();
    q.where_.push(Cond::Group {
        logic: Logic::Or,
        conds: vec![
            Cond::Compare {
                field: f("email"),
                op: BinaryOp::Eq,
                param: p("needle"),
            },
            Cond::Compare {
                field: f("name"),
                op: BinaryOp::ILike,
                param: p("needle"),
            },
        ],
    });

    let r = render(q);
    assert!(
        r.sql
            .ends_with("WHERE (\"email\" = $1 OR \"name\" ILIKE $1)")
    );
    assert_eq!(r.params, vec!["needle"]);
}

#[test]
fn between_renders_as_single_ternary() {
    let mut q = users();
    q.where_.push(Cond::Between {
        field: f("age"),
        low: p("lo"),
        high: p("hi"),
        negated: false,
    });
    q.where_.push(Cond::Between {
        field: f("score"),
        low: p("a"),
        high: p("b"),
        negated: true,
    });

    let r = render(q);
    assert!(
        r.sql
            .ends_with("WHERE \"age\" BETWEEN $1 AND $2 AND \"score\" NOT BETWEEN $3 AND $4")
    );
    assert_eq!(r.params.len(), 4);
}

#[test]
fn between_may_reuse_one_param_for_both_bounds() {
    let mut q = users();
    q.where_.push(Cond::Between {
        field: f("age"),
        low: p("exact"),
        high: p("exact"),
        negated: false,
    });

    let r = render(q);
    assert!(r.sql.ends_with("WHERE \"age\" BETWEEN $1 AND $1"));
    assert_eq!(r.params, vec!["exact"]);
}

#[test]
fn null_safe_equality_shares_one_placeholder() {
    let mut q = users();
    q.where_.push(Cond::NullSafeEq {
        field: f("age"),
        param: p("age"),
    });

    for renderer in [SqlRenderer::postgres(), SqlRenderer::redshift()] {
        let r = renderer.render(&q.clone().into()).unwrap();
        assert!(
            r.sql
                .ends_with("WHERE (\"age\" = $1 OR (\"age\" IS NULL AND $1 IS NULL))")
        );
        assert_eq!(r.params, vec!["age"]);
    }
}

#[test]
fn membership_binds_one_array_param() {
    let mut q = users();
    q.where_.push(Cond::Compare {
        field: f("id"),
        op: BinaryOp::In,
        param: p("ids"),
    });
    q.where_.push(Cond::Compare {
        field: f("status"),
        op: BinaryOp::NotIn,
        param: p("banned"),
    });

    let r = render(q.clone());
    assert!(
        r.sql
            .ends_with("\"id\" = ANY($1) AND \"status\" <> ALL($2)")
    );

    let err = SqlRenderer::redshift().render(&q.into()).unwrap_err();
    assert!(matches!(err, crate::OrmError::Render(_)));
}

#[test]
fn aggregate_with_filter_and_having() {
    let mut q = SelectAst::new(TableRef::new("orders"));
    q.items = vec![
        SelectItem::column(f("customer_id")),
        SelectItem {
            expr: ScalarExpr::Aggregate {
                func: AggFunc::Sum,
                arg: Some(Box::new(ScalarExpr::Column(f("total")))),
                filter: Some(Box::new(Cond::Compare {
                    field: f("status"),
                    op: BinaryOp::Eq,
                    param: p("status"),
                })),
                over: None,
            },
            alias: Some("paid".into()),
        },
    ];
    q.group_by = vec![f("customer_id")];
    q.having.push(Cond::Aggregate {
        func: AggFunc::Count,
        field: None,
        op: BinaryOp::Gt,
        param: p("min_orders"),
    });

    let r = render(q.clone());
    assert_eq!(
        r.sql,
        "SELECT \"customer_id\", SUM(\"total\") FILTER (WHERE \"status\" = $1) AS \"paid\" \
         FROM \"orders\" GROUP BY \"customer_id\" HAVING COUNT(*) > $2"
    );

    let err = SqlRenderer::redshift().render(&q.into()).unwrap_err();
    assert!(err.to_string().contains("FILTER"));
}

#[test]
fn window_and_case_expressions() {
    let mut q = SelectAst::new(TableRef::new("scores"));
    q.items = vec![
        SelectItem {
            expr: ScalarExpr::Window {
                func: WindowFunc::Rank,
                over: Window {
                    partition_by: vec![f("team")],
                    order_by: vec![OrderItem {
                        expr: ScalarExpr::Column(f("points")),
                        direction: Direction::Desc,
                        nulls: None,
                    }],
                },
            },
            alias: Some("pos".into()),
        },
        SelectItem {
            expr: ScalarExpr::Case {
                whens: vec![(
                    Cond::Null {
                        field: f("points"),
                        negated: false,
                    },
                    ScalarExpr::Param(p("none")),
                )],
                otherwise: Some(Box::new(ScalarExpr::Cast {
                    expr: Box::new(ScalarExpr::Column(f("points"))),
                    ty: CastType::Text,
                })),
            },
            alias: Some("label".into()),
        },
    ];

    let r = render(q);
    assert_eq!(
        r.sql,
        "SELECT RANK() OVER (PARTITION BY \"team\" ORDER BY \"points\" DESC) AS \"pos\", \
         CASE WHEN \"points\" IS NULL THEN $1 ELSE CAST(\"points\" AS TEXT) END AS \"label\" \
         FROM \"scores\""
    );
}

#[test]
fn insert_multi_row_with_upsert_and_returning() {
    let q = InsertAst {
        table: TableRef::new("users"),
        columns: vec![f("email"), f("age")],
        rows: vec![
            vec![p("email_0"), p("age_0")],
            vec![p("email_1"), p("age_1")],
        ],
        conflict: Some(Conflict::DoUpdate {
            target: vec![f("email")],
            set: vec![f("age")],
        }),
        returning: vec![f("id")],
    };

    let r = render(q.clone());
    assert_eq!(
        r.sql,
        "INSERT INTO \"users\" (\"email\", \"age\") VALUES ($1, $2), ($3, $4) \
         ON CONFLICT (\"email\") DO UPDATE SET \"age\" = EXCLUDED.\"age\" RETURNING \"id\""
    );
    assert_eq!(r.params, vec!["email_0", "age_0", "email_1", "age_1"]);

    let err = SqlRenderer::redshift().render(&q.into()).unwrap_err();
    assert!(err.to_string().contains("ON CONFLICT"));
}

#[test]
fn update_returning_depends_on_capability() {
    let q = UpdateAst {
        table: TableRef::new("users"),
        set: vec![(f("email"), p("email"))],
        where_: vec![Cond::Compare {
            field: f("id"),
            op: BinaryOp::Eq,
            param: p("id"),
        }],
        returning: vec![f("id"), f("email")],
    };

    let r = render(q.clone());
    assert_eq!(
        r.sql,
        "UPDATE \"users\" SET \"email\" = $1 WHERE \"id\" = $2 RETURNING \"id\", \"email\""
    );

    let redshift = SqlRenderer::redshift();
    assert!(!redshift.capabilities().returning_on_update);
    assert!(redshift.render(&q.into()).is_err());
}

#[test]
fn compound_prefixes_each_sub_query() {
    let mut a = users();
    a.where_.push(Cond::Compare {
        field: f("id"),
        op: BinaryOp::Eq,
        param: p("id"),
    });
    let b = a.clone();

    let q = CompoundAst {
        first: a,
        rest: vec![(SetOp::UnionAll, b)],
        order_by: vec![OrderItem {
            expr: ScalarExpr::Column(f("email")),
            direction: Direction::Asc,
            nulls: None,
        }],
        limit: Some(Bound::Param(p("page_size"))),
        offset: None,
    };

    let r = render(q);
    assert_eq!(
        r.sql,
        "(SELECT \"id\", \"email\" FROM \"users\" WHERE \"id\" = $1) UNION ALL \
         (SELECT \"id\", \"email\" FROM \"users\" WHERE \"id\" = $2) \
         ORDER BY \"email\" ASC LIMIT $3"
    );
    assert_eq!(r.params, vec!["q0_id", "q1_id", "page_size"]);
}

#[test]
fn capabilities_can_be_overridden() {
    let caps = Capabilities {
        row_locking: false,
        ..Capabilities::all()
    };
    let renderer = SqlRenderer::postgres().with_capabilities(caps);
    let mut q = users();
    q.lock = Some(Lock::Update);
    assert!(renderer.render(&q.clone().into()).is_err());
    assert!(render(q).sql.ends_with(" FOR UPDATE"));
}

#[test]
fn vector_distance_in_ordering() {
    let mut q = users();
    q.order_by.push(OrderItem {
        expr: ScalarExpr::Binary {
            left: Box::new(ScalarExpr::Column(f("embedding"))),
            op: BinaryOp::CosineDistance,
            right: Box::new(ScalarExpr::Param(p("query"))),
        },
        direction: Direction::Asc,
        nulls: None,
    });

    let r = render(q.clone());
    assert!(r.sql.ends_with("ORDER BY (\"embedding\" <=> $1) ASC"));
    assert!(SqlRenderer::redshift().render(&q.into()).is_err());
}
