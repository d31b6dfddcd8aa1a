//! End-to-end alteration planning scenarios.

use redshift_ddl::prelude::*;

fn varchar(name: &str, len: u32) -> ColumnDescriptor {
    ColumnDescriptor::new(name, LogicalType::Varchar(Some(len)))
}

fn planner(catalog: StaticCatalog) -> SchemaPlanner<StaticCatalog> {
    SchemaPlanner::new(PlannerConfig::default(), catalog)
}

#[test]
fn add_nullable_char_field_emits_single_statement() {
    let plan = planner(StaticCatalog::new())
        .plan_add_field("test_pony", &varchar("name", 10))
        .unwrap();
    assert_eq!(
        plan.rendered(),
        vec![r#"ALTER TABLE "test_pony" ADD COLUMN "name" varchar(10) NULL;"#]
    );
}

#[test]
fn resize_with_default_stays_in_place_both_directions() {
    let p = planner(StaticCatalog::new());
    let base = |len| {
        varchar("name", len)
            .not_null()
            .default(DefaultValue::String(String::new()))
    };

    let grow = p.alteration_request("test_pony", base(10), base(20));
    let plan = p.plan_alter_field(&grow).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![r#"ALTER TABLE "test_pony" ALTER COLUMN "name" TYPE varchar(20);"#]
    );

    let shrink = p.alteration_request("test_pony", base(20), base(10));
    let plan = p.plan_alter_field(&shrink).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![r#"ALTER TABLE "test_pony" ALTER COLUMN "name" TYPE varchar(10);"#]
    );
}

#[test]
fn identical_descriptors_plan_nothing_twice() {
    let p = planner(StaticCatalog::new());
    let column = varchar("name", 10).not_null().default(DefaultValue::String(String::new()));
    for _ in 0..2 {
        let request = p.alteration_request("test_pony", column.clone(), column.clone());
        let plan = p.plan_alter_field(&request).unwrap();
        assert!(plan.is_empty());
    }
}

#[test]
fn notnull_to_nullable_routes_through_shadow_protocol() {
    let p = planner(StaticCatalog::new());
    let old = ColumnDescriptor::new("weight", LogicalType::Float).not_null();
    let new = ColumnDescriptor::new("weight", LogicalType::Float);
    let request = p.alteration_request("test_pony", old, new);
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![
            r#"ALTER TABLE "test_pony" ADD COLUMN "weight_tmp" double precision NULL;"#,
            r#"UPDATE "test_pony" SET "weight_tmp" = "weight" WHERE "weight" IS NOT NULL;"#,
            r#"ALTER TABLE "test_pony" DROP COLUMN "weight" CASCADE;"#,
            r#"ALTER TABLE "test_pony" RENAME COLUMN "weight_tmp" TO "weight";"#,
        ]
    );
}

#[test]
fn backwards_notnull_restore_synthesizes_zero_default() {
    let p = planner(StaticCatalog::new());
    let old = ColumnDescriptor::new("weight", LogicalType::Float);
    let new = ColumnDescriptor::new("weight", LogicalType::Float).not_null();
    let request = p.alteration_request("test_pony", old, new).backwards();
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered()[0],
        r#"ALTER TABLE "test_pony" ADD COLUMN "weight_tmp" double precision DEFAULT 0.0 NOT NULL;"#
    );
    assert_eq!(plan.len(), 4);
}

#[test]
fn type_change_routes_through_shadow_protocol() {
    let p = planner(StaticCatalog::new());
    let old = ColumnDescriptor::new("weight", LogicalType::Float).not_null();
    let new = varchar("weight", 10)
        .not_null()
        .default(DefaultValue::String(String::new()));
    let request = p.alteration_request("test_pony", old, new);
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![
            r#"ALTER TABLE "test_pony" ADD COLUMN "weight_tmp" varchar(10) DEFAULT '' NOT NULL;"#,
            r#"UPDATE "test_pony" SET "weight_tmp" = "weight" WHERE "weight" IS NOT NULL;"#,
            r#"ALTER TABLE "test_pony" DROP COLUMN "weight" CASCADE;"#,
            r#"ALTER TABLE "test_pony" RENAME COLUMN "weight_tmp" TO "weight";"#,
        ]
    );
    // The shadow add binds exactly the effective default.
    assert_eq!(
        plan.statements[0].params,
        vec![DefaultValue::String(String::new())]
    );
}

#[test]
fn shadow_protocol_round_trip_keeps_null_guard() {
    let p = planner(StaticCatalog::new());
    let a = varchar("hash", 10)
        .not_null()
        .default(DefaultValue::String(String::new()));
    let b = ColumnDescriptor::new("hash", LogicalType::Binary(Some(10)))
        .not_null()
        .default(DefaultValue::Bytes(vec![0x80, 0x00]));

    let there = p
        .plan_alter_field(&p.alteration_request("test_pony", a.clone(), b.clone()))
        .unwrap();
    let back = p
        .plan_alter_field(&p.alteration_request("test_pony", b, a))
        .unwrap();

    assert_eq!(there.len(), 4);
    assert_eq!(back.len(), 4);
    assert_eq!(
        there.rendered()[1],
        r#"UPDATE "test_pony" SET "hash_tmp" = "hash"::varbyte WHERE "hash" IS NOT NULL;"#
    );
    assert_eq!(
        back.rendered()[1],
        r#"UPDATE "test_pony" SET "hash_tmp" = "hash"::varchar WHERE "hash" IS NOT NULL;"#
    );
}

#[test]
fn unique_resize_recreates_owning_constraint() {
    let mut catalog = StaticCatalog::new();
    catalog.add_constraint(
        "test_pony",
        ConstraintRef::new(
            "test_pony_name_uniq",
            ConstraintKind::Unique,
            vec!["name".to_string()],
        ),
    );
    let p = planner(catalog);
    let old = varchar("name", 10)
        .not_null()
        .default(DefaultValue::String(String::new()))
        .unique();
    let new = varchar("name", 20)
        .not_null()
        .default(DefaultValue::String(String::new()))
        .unique();
    let request = p.alteration_request("test_pony", old, new).strict();
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![
            r#"ALTER TABLE "test_pony" DROP CONSTRAINT "test_pony_name_uniq";"#,
            r#"ALTER TABLE "test_pony" ALTER COLUMN "name" TYPE varchar(20);"#,
            r#"ALTER TABLE "test_pony" ADD CONSTRAINT "test_pony_name_uniq" UNIQUE ("name");"#,
        ]
    );
}

#[test]
fn primary_key_resize_cascades_into_referencing_tables() {
    let mut catalog = StaticCatalog::new();
    catalog.add_constraint(
        "test_pony",
        ConstraintRef::new(
            "test_pony_pkey",
            ConstraintKind::PrimaryKey,
            vec!["id".to_string()],
        ),
    );
    catalog.add_constraint(
        "test_rider",
        ConstraintRef::new(
            "test_rider_pony_id_fk_test_pony_id",
            ConstraintKind::ForeignKey,
            vec!["pony_id".to_string()],
        ),
    );
    catalog.add_relation(
        "test_pony",
        "id",
        Relation {
            table: "test_rider".to_string(),
            column: varchar("pony_id", 10)
                .not_null()
                .references("test_pony", "id"),
        },
    );

    let p = planner(catalog);
    let old = varchar("id", 10)
        .primary_key()
        .default(DefaultValue::String(String::new()));
    let new = varchar("id", 20)
        .primary_key()
        .default(DefaultValue::String(String::new()));
    let request = p.alteration_request("test_pony", old, new).strict();
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![
            r#"ALTER TABLE "test_rider" DROP CONSTRAINT "test_rider_pony_id_fk_test_pony_id";"#,
            r#"ALTER TABLE "test_pony" DROP CONSTRAINT "test_pony_pkey";"#,
            r#"ALTER TABLE "test_pony" ALTER COLUMN "id" TYPE varchar(20);"#,
            r#"ALTER TABLE "test_pony" ADD CONSTRAINT "test_pony_id_pk" PRIMARY KEY ("id");"#,
            r#"ALTER TABLE "test_rider" ALTER COLUMN "pony_id" TYPE varchar(20);"#,
            r#"ALTER TABLE "test_rider" ADD CONSTRAINT "test_rider_pony_id_fk_test_pony_id" FOREIGN KEY ("pony_id") REFERENCES "test_pony" ("id");"#,
        ]
    );
}

#[test]
fn add_not_null_without_default_fails_with_no_statements() {
    let p = planner(StaticCatalog::new());
    let column = varchar("name", 10).not_null();
    let err = p.plan_add_field("test_pony", &column).unwrap_err();
    assert!(matches!(err, SchemaError::MissingDefault { .. }));
}

#[test]
fn strict_mode_rejects_missing_unique_constraint() {
    // The catalog has no unique constraint for the column, so a strict
    // resize cannot tell which constraint to touch.
    let p = planner(StaticCatalog::new());
    let old = varchar("name", 10).unique();
    let new = varchar("name", 20).unique();
    let request = p.alteration_request("test_pony", old, new).strict();
    assert!(matches!(
        p.plan_alter_field(&request).unwrap_err(),
        SchemaError::AmbiguousConstraints {
            expected: 1,
            actual: 0,
            ..
        }
    ));
}

#[test]
fn rename_precedes_value_change() {
    let p = planner(StaticCatalog::new());
    let old = varchar("nickname", 10);
    let new = varchar("name", 20);
    let request = p.alteration_request("test_pony", old, new);
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![
            r#"ALTER TABLE "test_pony" RENAME COLUMN "nickname" TO "name";"#,
            r#"ALTER TABLE "test_pony" ALTER COLUMN "name" TYPE varchar(20);"#,
        ]
    );
}

#[test]
fn uniqueness_removal_drops_constraint_only() {
    let mut catalog = StaticCatalog::new();
    catalog.add_constraint(
        "test_pony",
        ConstraintRef::new(
            "test_pony_name_uniq",
            ConstraintKind::Unique,
            vec!["name".to_string()],
        ),
    );
    let p = planner(catalog);
    let old = varchar("name", 10).unique();
    let new = varchar("name", 10);
    let request = p.alteration_request("test_pony", old, new).strict();
    let plan = p.plan_alter_field(&request).unwrap();
    assert_eq!(
        plan.rendered(),
        vec![r#"ALTER TABLE "test_pony" DROP CONSTRAINT "test_pony_name_uniq";"#]
    );
}
