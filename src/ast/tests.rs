//! Tests for the AST module as a whole
//!
//! These tests build statements by hand and check the SQL the renderer
//! produces for them. Builder-level behaviour lives in `builder::tests`.

use super::*;

mod expr_tests {
    use super::*;

    #[test]
    fn test_column_expressions() {
        // Simple column
        let col = Expr::column("id");
        assert_eq!(render_expr(&col), "\"id\"");

        // Qualified column
        let col = Expr::qualified_column("users", "email");
        assert_eq!(render_expr(&col), "\"users\".\"email\"");
    }

    #[test]
    fn test_literal_expressions() {
        assert_eq!(render_expr(&Expr::bool(true)), "true");
        assert_eq!(render_expr(&Expr::bool(false)), "false");
        assert_eq!(render_expr(&Expr::int(42)), "42");
        assert_eq!(render_expr(&Expr::int(-100)), "-100");
        assert_eq!(render_expr(&Expr::string("hello")), "'hello'");
        assert_eq!(render_expr(&Expr::default_value()), "default");
    }

    #[test]
    fn test_binary_operations() {
        let expr = Expr::column("id").eq(Expr::string("1"));
        assert_eq!(render_expr(&expr), "\"id\" = '1'");

        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)));
        assert_eq!(render_expr(&expr), "\"a\" = 1 and \"b\" = 2");

        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .or(Expr::column("b").eq(Expr::int(2)));
        assert!(render_expr(&expr).contains(" or "));
    }

    #[test]
    fn test_and_under_or_needs_no_parentheses() {
        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)))
            .or(Expr::column("c").eq(Expr::int(3)));
        assert_eq!(
            render_expr(&expr),
            "\"a\" = 1 and \"b\" = 2 or \"c\" = 3"
        );
    }

    #[test]
    fn test_list_comparison() {
        let expr = Expr::list(vec![Expr::column("a"), Expr::column("b")])
            .eq(Expr::list(vec![Expr::string("1"), Expr::string("2")]));
        assert_eq!(render_expr(&expr), "(\"a\", \"b\") = ('1', '2')");
    }

    #[test]
    fn test_function_call() {
        assert_eq!(render_expr(&now().into()), "now()");
        assert_eq!(
            render_expr(&Expr::function("lower", vec![Expr::column("email")])),
            "lower(\"email\")"
        );
    }

    #[test]
    fn test_conjunction() {
        assert!(conjunction(Vec::new()).is_none());

        let expr = conjunction(vec![
            Expr::column("a").eq(Expr::int(1)),
            Expr::column("b").eq(Expr::int(2)),
            Expr::column("c").eq(Expr::int(3)),
        ])
        .unwrap();
        assert_eq!(
            render_expr(&expr),
            "\"a\" = 1 and \"b\" = 2 and \"c\" = 3"
        );
    }
}

mod stmt_tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let stmt =
            SelectStmt::columns(vec![SelectColumn::star()]).with_from(FromClause::table("users"));
        let sql = render(&Stmt::Select(stmt));
        assert!(sql.contains("select *"));
        assert!(sql.contains("from \"users\""));
    }

    #[test]
    fn test_select_without_columns() {
        let stmt = SelectStmt::new().with_from(FromClause::table("users"));
        assert_eq!(render(&Stmt::Select(stmt)), "select from \"users\"");
    }

    #[test]
    fn test_select_with_schema_and_alias() {
        let stmt = SelectStmt::columns(vec![SelectColumn::expr_as(
            Expr::qualified_column("u", "id"),
            "user_id",
        )])
        .with_from(FromClause::qualified_table(Some(Ident::new("public")), "users").with_alias("u"));
        assert_eq!(
            render(&Stmt::Select(stmt)),
            "select \"u\".\"id\" as \"user_id\" from \"public\".\"users\" \"u\""
        );
    }

    #[test]
    fn test_select_cross_join() {
        let stmt = SelectStmt::columns(vec![SelectColumn::star()])
            .with_from(FromClause::table("a").cross_join(FromClause::table("b")));
        assert_eq!(
            render(&Stmt::Select(stmt)),
            "select * from \"a\" cross join \"b\""
        );
    }

    #[test]
    fn test_insert_single_row() {
        let stmt = InsertStmt::new(
            "users",
            vec![Ident::new("name"), Ident::new("email")],
            InsertValues::Values(vec![vec![
                Expr::string("Alice"),
                Expr::string("alice@example.com"),
            ]]),
        );
        assert_eq!(
            render(&Stmt::Insert(stmt)),
            "insert into \"users\" (\"name\", \"email\") values ('Alice', 'alice@example.com')"
        );
    }

    #[test]
    fn test_insert_multiple_rows() {
        let stmt = InsertStmt::new(
            "users",
            vec![Ident::new("name")],
            InsertValues::Values(vec![vec![Expr::string("Alice")], vec![Expr::string("Bob")]]),
        );
        let sql = render(&Stmt::Insert(stmt));
        assert!(sql.ends_with("values ('Alice'), ('Bob')"));
    }

    #[test]
    fn test_insert_with_returning() {
        let stmt = InsertStmt::new(
            "users",
            vec![Ident::new("name")],
            InsertValues::Values(vec![vec![Expr::string("Alice")]]),
        )
        .with_returning(vec![SelectColumn::column("id"), SelectColumn::column("name")]);
        let sql = render(&Stmt::Insert(stmt));
        assert!(sql.ends_with("returning \"id\", \"name\""));
    }

    #[test]
    fn test_insert_from_query() {
        let query = SelectStmt::columns(vec![
            SelectColumn::expr(Expr::qualified_column("user", "id")),
            SelectColumn::expr(Expr::qualified_column("account", "id")),
        ])
        .with_from(FromClause::table("user").cross_join(FromClause::table("account")));
        let stmt = InsertStmt::new(
            "user_account",
            vec![Ident::new("user_id"), Ident::new("account_id")],
            InsertValues::Query(Box::new(query)),
        );
        assert_eq!(
            render(&Stmt::Insert(stmt)),
            "insert into \"user_account\" (\"user_id\", \"account_id\") \
             select \"user\".\"id\", \"account\".\"id\" from \"user\" cross join \"account\""
        );
    }

    #[test]
    fn test_upsert_do_update() {
        let stmt = InsertStmt::new(
            "user",
            vec![Ident::new("id"), Ident::new("data")],
            InsertValues::Values(vec![vec![Expr::string("1"), Expr::string("a")]]),
        )
        .with_on_conflict(OnConflict {
            target: Some(OnConflictTarget::Columns(vec![Ident::new("id")])),
            action: OnConflictAction::DoUpdate {
                sets: vec![ColumnAssignment::new("data", Expr::string("b"))],
            },
        });
        let sql = render_with(&Stmt::Insert(stmt), RenderOptions::conventional());
        assert_eq!(
            sql,
            "INSERT INTO \"user\" (id, data) VALUES ('1', 'a') \
             ON CONFLICT (id) DO UPDATE SET data = 'b'"
        );
    }

    #[test]
    fn test_update_basic() {
        let stmt = UpdateStmt::new(
            "users",
            vec![
                ColumnAssignment::new("name", Expr::string("Bob")),
                ColumnAssignment::new("updated_at", now().into()),
            ],
            Expr::list(vec![Expr::column("id")]).eq(Expr::list(vec![Expr::string("1")])),
        );
        assert_eq!(
            render(&Stmt::Update(stmt)),
            "update \"users\" set \"name\" = 'Bob', \"updated_at\" = now() where (\"id\") = ('1')"
        );
    }

    #[test]
    fn test_delete_basic() {
        let stmt = DeleteStmt::new("users", Expr::column("active").eq(Expr::bool(false)))
            .with_schema(Some(Ident::new("public")));
        assert_eq!(
            render(&Stmt::Delete(stmt)),
            "delete from \"public\".\"users\" where \"active\" = false"
        );
    }
}

mod cte_tests {
    use super::*;

    fn insert(table: &str) -> InsertStmt {
        InsertStmt::new(
            table,
            vec![Ident::new("name")],
            InsertValues::Values(vec![vec![Expr::string("x")]]),
        )
    }

    #[test]
    fn test_data_modifying_cte() {
        let stmt = WithStmt::new(
            vec![Cte::new(
                "new_user",
                Stmt::Insert(insert("users").with_returning(vec![SelectColumn::column("id")])),
            )],
            Stmt::Select(
                SelectStmt::columns(vec![SelectColumn::star()])
                    .with_from(FromClause::table("new_user")),
            ),
        );
        assert_eq!(
            render(&Stmt::With(stmt)),
            "with \"new_user\" as (insert into \"users\" (\"name\") values ('x') returning \"id\") \
             select * from \"new_user\""
        );
    }

    #[test]
    fn test_nested_with_renders_flat_chain_of_clauses() {
        let inner =
            rewrite::insert_with("a", &Stmt::Insert(insert("a")), &Stmt::Insert(insert("t"))).unwrap();
        let outer = rewrite::insert_with("b", &Stmt::Insert(insert("b")), &inner).unwrap();
        let sql = render(&outer);
        assert!(sql.starts_with("with \"a\" as ("));
        assert!(sql.contains("), \"b\" as ("));
        assert!(sql.ends_with("insert into \"t\" (\"name\") values ('x')"));
    }

    #[test]
    fn test_try_render_checks_bindings() {
        let bad = InsertStmt::new(
            "a",
            vec![Ident::new("x"), Ident::new("y")],
            InsertValues::Values(vec![vec![Expr::string("1")]]),
        );
        let stmt = WithStmt::new(vec![Cte::new("a", Stmt::Insert(bad))], Stmt::Insert(insert("t")));
        assert!(try_render(&Stmt::With(stmt), RenderOptions::default()).is_err());
    }

    #[test]
    fn test_try_render_rejects_nested_data_modifying_with() {
        let nested = WithStmt::new(vec![Cte::new("a", Stmt::Insert(insert("a")))], Stmt::Insert(insert("b")));
        let stmt = WithStmt::new(vec![Cte::new("b", Stmt::With(nested))], Stmt::Insert(insert("t")));
        let err = try_render(&Stmt::With(stmt), RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("nests a data-modifying with statement"));

        // A read-only WITH may still be nested
        let read_only = WithStmt::new(
            vec![Cte::new("s", Stmt::Select(SelectStmt::columns(vec![SelectColumn::star()])))],
            Stmt::Select(SelectStmt::columns(vec![SelectColumn::star()]).with_from(FromClause::table("s"))),
        );
        let stmt = WithStmt::new(vec![Cte::new("r", Stmt::With(read_only))], Stmt::Insert(insert("t")));
        assert!(try_render(&Stmt::With(stmt), RenderOptions::default()).is_ok());
    }

    #[test]
    fn test_try_render_rejects_repeated_alias() {
        let stmt = WithStmt::new(
            vec![
                Cte::new("a", Stmt::Insert(insert("a"))),
                Cte::new("a", Stmt::Insert(insert("b"))),
            ],
            Stmt::Insert(insert("t")),
        );
        assert!(try_render(&Stmt::With(stmt), RenderOptions::default()).is_err());
    }
}

mod safety_tests {
    use super::*;
    use proptest::prelude::*;

    /// Count unescaped double quotes: the quoting is sound when a rendered
    /// identifier opens and closes exactly one quoted token.
    fn is_single_quoted_token(sql: &str) -> bool {
        let inner = match sql.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            Some(inner) => inner,
            None => return false,
        };
        inner.replace("\"\"", "").chars().all(|c| c != '"')
    }

    #[test]
    fn test_injection_identifier_stays_one_token() {
        let sql = render_expr(&Expr::column("tables\"; DROP SCHEMA public CASCADE; -- "));
        assert_eq!(sql, "\"tables\"\"; DROP SCHEMA public CASCADE; -- \"");
        assert!(is_single_quoted_token(&sql));
    }

    #[test]
    fn test_when_needed_quotes_keywords() {
        let render_ident = |name: &str| {
            let mut renderer = SqlRenderer::with_options(RenderOptions::conventional());
            Ident::new(name).render(&mut renderer);
            renderer.into_sql()
        };

        for keyword in ["select", "user", "join", "left", "is", "cross", "like", "verbose"] {
            assert_eq!(render_ident(keyword), format!("\"{}\"", keyword));
        }
        assert_eq!(render_ident("joined"), "joined");
    }

    proptest! {
        #[test]
        fn prop_identifiers_are_always_one_token(name in ".*") {
            let sql = render_expr(&Expr::column(name.as_str()));
            prop_assert!(is_single_quoted_token(&sql));
        }

        #[test]
        fn prop_string_literals_round_trip(value in ".*") {
            let sql = render_expr(&Expr::string(value.as_str()));
            let inner = &sql[1..sql.len() - 1];
            prop_assert_eq!(inner.replace("''", "'"), value);
        }

        #[test]
        fn prop_when_needed_quoting_is_sound(name in "[a-zA-Z_\"][a-zA-Z0-9_ \"]{0,12}") {
            let mut renderer = SqlRenderer::with_options(RenderOptions::conventional());
            Ident::new(name.as_str()).render(&mut renderer);
            let sql = renderer.into_sql();
            if sql.starts_with('"') {
                prop_assert!(is_single_quoted_token(&sql));
            } else {
                prop_assert_eq!(&sql, &name);
                prop_assert!(sql.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            }
        }
    }
}
