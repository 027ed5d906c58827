//! Runs against a live database when `DATABASE_URL` is set (a `.env` file
//! is honoured); otherwise every test prints a note and passes.

use fluorm::tokio_postgres::{self, Row};
use fluorm::{
    Capabilities, ColumnMeta, FromRow, GenericClient, Model, OrmError, OrmResult, Params,
    RowExt, SqlRenderer, Table, TableSchema, c, null,
};

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: i64,
    email: String,
    age: Option<i32>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            email: row.try_get_column("email")?,
            age: row.try_get_column("age")?,
        })
    }
}

impl Model for User {
    fn table_schema() -> TableSchema {
        TableSchema::new("fluorm_users")
            .column(ColumnMeta::new("id").primary_key())
            .column(ColumnMeta::new("email"))
            .column(ColumnMeta::new("age").nullable())
    }
}

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    client
        .batch_execute(
            "CREATE TEMP TABLE fluorm_users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                age INTEGER
            )",
        )
        .await
        .expect("create temp table");
    Some(client)
}

fn users() -> Table<User> {
    Table::for_model(SqlRenderer::postgres()).unwrap()
}

/// Postgres without RETURNING, to drive the read-back paths.
fn users_without_returning() -> Table<User> {
    let caps = Capabilities {
        returning_on_insert: false,
        returning_on_update: false,
        ..Capabilities::all()
    };
    Table::for_model(SqlRenderer::postgres().with_capabilities(caps)).unwrap()
}

fn user(email: &'static str, age: Option<i32>) -> Params {
    Params::new().set("email", email).set("age", age)
}

async fn seed(client: &impl GenericClient) {
    let rows = vec![
        user("ada@example.com", Some(36)),
        user("bob@example.com", Some(18)),
        user("cy@example.com", Some(12)),
    ];
    let n = users().insert().exec_batch(client, &rows).await.unwrap();
    assert_eq!(n, 3);
}

#[tokio::test]
async fn many_and_one_paths_disagree_on_two_rows() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    seed(&client).await;

    let params = Params::new().set("min_age", 18i32);
    let adults = users()
        .select()
        .where_("age", ">=", "min_age")
        .order_by("age", "desc")
        .fetch_all(&client, &params)
        .await
        .unwrap();
    assert_eq!(adults.len(), 2);
    assert_eq!(adults[0].email, "ada@example.com");

    let err = users()
        .select_one()
        .where_("age", ">=", "min_age")
        .fetch_one(&client, &params)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::TooManyRows { got: 2, .. }));
}

#[tokio::test]
async fn insert_and_update_return_the_row() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    for table in [users(), users_without_returning()] {
        let email = if table.capabilities().returning_on_insert {
            "inline@example.com"
        } else {
            "fallback@example.com"
        };
        let inserted = table
            .insert()
            .exec(&client, &user(email, Some(40)))
            .await
            .unwrap();
        assert_eq!(inserted.email, email);

        let updated = table
            .update()
            .set("age", "age")
            .where_("id", "=", "id")
            .exec(
                &client,
                &Params::new().set("age", Some(41i32)).set("id", inserted.id),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.age, Some(41));
    }
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    for table in [users(), users_without_returning()] {
        let err = table
            .update()
            .set("age", "age")
            .where_("id", "=", "id")
            .exec(&client, &Params::new().set("age", 1i32).set("id", -1i64))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

#[tokio::test]
async fn compound_params_are_prefixed() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    seed(&client).await;

    let users = users();
    let q = users
        .select()
        .where_("email", "=", "email")
        .union(users.select().where_("email", "=", "email"))
        .order_by("email", "asc");
    let params = Params::new()
        .set("email", "cy@example.com")
        .prefixed(0)
        .merge(Params::new().set("email", "ada@example.com").prefixed(1));

    let found = q.fetch_all(&client, &params).await.unwrap();
    let emails: Vec<_> = found.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["ada@example.com", "cy@example.com"]);
}

#[tokio::test]
async fn aggregates_decode_as_f64() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let avg = users()
        .avg("age")
        .fetch(&client, &Params::new())
        .await
        .unwrap();
    assert_eq!(avg, 0.0);

    seed(&client).await;
    let n = users()
        .count()
        .where_or([c("age", "<", "young"), null("age")])
        .fetch(&client, &Params::new().set("young", 18i32))
        .await
        .unwrap();
    assert_eq!(n, 1.0);

    let adults = users()
        .count()
        .filter(c("age", ">=", "min_age"))
        .fetch(&client, &Params::new().set("min_age", 18i32))
        .await
        .unwrap();
    assert_eq!(adults, 2.0);
}

#[tokio::test]
async fn batch_delete_inside_a_transaction() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    seed(&client).await;

    let tx = client.transaction().await.unwrap();
    let sets = vec![
        Params::new().set("email", "ada@example.com"),
        Params::new().set("email", "nobody@example.com"),
        Params::new().set("email", "cy@example.com"),
    ];
    let n = users()
        .delete()
        .where_("email", "=", "email")
        .exec_batch(&tx, &sets)
        .await
        .unwrap();
    assert_eq!(n, 2);
    tx.rollback().await.unwrap();

    let left = users()
        .count()
        .fetch(&client, &Params::new())
        .await
        .unwrap();
    assert_eq!(left, 3.0);
}

#[tokio::test]
async fn membership_and_unique_violation() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    seed(&client).await;

    let found = users()
        .select()
        .where_("email", "in", "emails")
        .fetch_all(
            &client,
            &Params::new().set("emails", vec!["bob@example.com".to_string()]),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let err = users()
        .insert()
        .exec(&client, &user("bob@example.com", None))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert!(err.to_string().starts_with("insert fluorm_users: "));
}

#[tokio::test]
async fn read_back_finds_rows_with_null_columns() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let inserted = users_without_returning()
        .insert()
        .exec(&client, &user("nobody@example.com", None))
        .await
        .unwrap();
    assert_eq!(inserted.email, "nobody@example.com");
    assert_eq!(inserted.age, None);

    let stored = users()
        .select_one()
        .where_null("age")
        .fetch_one(&client, &Params::new())
        .await
        .unwrap();
    assert_eq!(stored, inserted);
}
