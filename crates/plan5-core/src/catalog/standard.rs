//! The stock Schichtplaner 5 table catalog.
//!
//! Column headers follow the archive's DBF layout; API field names are the
//! snake_case equivalents. Optional tables are absent from smaller or
//! older installations.

use super::{Catalog, FieldDef, FieldKind, RelationDef, TableDef};

use self::FieldKind::{Date, Float, Int, Text};

fn id() -> FieldDef {
    FieldDef::required("id", Int)
}

fn employee_id() -> FieldDef {
    FieldDef::required("employee_id", Int).with_column("EMPLOYEEID")
}

impl Catalog {
    /// The built-in catalog covering the stock shift-planning archive.
    ///
    /// The declarations are data; installations with extra tables extend
    /// this via [`Catalog::from_json`] instead of new code.
    pub fn standard() -> Catalog {
        let builder = Catalog::builder()
            .table(
                TableDef::new("5EMPL")
                    .with_description("Employee master data")
                    .with_fields([
                        id(),
                        FieldDef::new("position", Int),
                        FieldDef::new("number", Text),
                        FieldDef::required("name", Text),
                        FieldDef::new("firstname", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("salutation", Text),
                        FieldDef::new("street", Text),
                        FieldDef::new("zip", Text),
                        FieldDef::new("town", Text),
                        FieldDef::new("phone", Text),
                        FieldDef::new("email", Text),
                        FieldDef::new("function", Text),
                        FieldDef::new("sex", Int),
                        FieldDef::new("birthday", Date),
                        FieldDef::new("empstart", Date),
                        FieldDef::new("empend", Date),
                        FieldDef::new("hrsday", Float),
                        FieldDef::new("hrsweek", Float),
                        FieldDef::new("hrsmonth", Float),
                        FieldDef::new("workdays", Text),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5GROUP")
                    .with_description("Groups and departments")
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("superid", Int),
                        FieldDef::new("position", Int),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5SHIFT")
                    .with_description("Shift definitions")
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("position", Int),
                        FieldDef::new("startend0", Text),
                        FieldDef::new("startend1", Text),
                        FieldDef::new("startend2", Text),
                        FieldDef::new("startend3", Text),
                        FieldDef::new("startend4", Text),
                        FieldDef::new("startend5", Text),
                        FieldDef::new("startend6", Text),
                        FieldDef::new("duration0", Float),
                        FieldDef::new("duration1", Float),
                        FieldDef::new("duration2", Float),
                        FieldDef::new("duration3", Float),
                        FieldDef::new("duration4", Float),
                        FieldDef::new("duration5", Float),
                        FieldDef::new("duration6", Float),
                        FieldDef::new("category", Int),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5WOPL")
                    .with_description("Work locations")
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("position", Int),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5LEAVT")
                    .with_description("Leave and absence types")
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("position", Int),
                        FieldDef::new("chargetype", Int),
                        FieldDef::new("chargehrs", Float),
                        FieldDef::new("entitled", Int),
                        FieldDef::new("stdentit", Float),
                        FieldDef::new("carryfwd", Int),
                        FieldDef::new("validdays", Text),
                        FieldDef::new("category", Int),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5ABSEN")
                    .with_description("Employee absences")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::required("date", Date),
                        FieldDef::new("leave_type_id", Int).with_column("LEAVETYPID"),
                        FieldDef::new("type", Text),
                        FieldDef::new("interval", Text),
                        FieldDef::new("start", Text),
                        FieldDef::new("end", Text),
                    ]),
            )
            .table(
                TableDef::new("5SPSHI")
                    .with_description("Shift plan details")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::required("date", Date),
                        FieldDef::new("name", Text),
                        FieldDef::new("shortname", Text),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("workplace_id", Int).with_column("WORKPLACID"),
                        FieldDef::new("type", Int),
                        FieldDef::new("startend", Text),
                        FieldDef::new("duration", Float),
                    ]),
            )
            .table(
                TableDef::new("5MASHI")
                    .with_description("Employee shift assignments (older archives)")
                    .optional()
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::required("date", Date),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("workplace_id", Int).with_column("WORKPLACID"),
                        FieldDef::new("type", Int),
                    ]),
            )
            .table(
                TableDef::new("5NOTE")
                    .with_description("Per-employee calendar notes")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("date", Date),
                        FieldDef::new("text1", Text),
                        FieldDef::new("text2", Text),
                    ]),
            )
            .table(
                TableDef::new("5GRASG")
                    .with_description("Employee-to-group assignments")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::required("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("position", Int),
                    ]),
            )
            .table(
                TableDef::new("5LEAEN")
                    .with_description("Leave entitlements per employee and year")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("year", Int),
                        FieldDef::new("leave_type_id", Int).with_column("LEAVETYPID"),
                        FieldDef::new("entitlement", Float).with_column("ENTITLEMEN"),
                        FieldDef::new("rest", Float),
                        FieldDef::new("indays", Int),
                    ]),
            )
            .table(
                TableDef::new("5CYCLE")
                    .with_description("Shift cycles")
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("position", Int),
                        FieldDef::new("size", Int),
                        FieldDef::new("unit", Int),
                        FieldDef::new("hide", Int),
                    ]),
            )
            .table(
                TableDef::new("5CYASS")
                    .with_description("Cycle assignments per employee")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("cycle_id", Int).with_column("CYCLEID"),
                        FieldDef::new("start", Date),
                        FieldDef::new("end", Date),
                        FieldDef::new("entrance", Text),
                    ]),
            )
            .table(
                TableDef::new("5CYENT")
                    .with_description("Cycle entitlements mapping cycles to shifts")
                    .with_fields([
                        FieldDef::required("id", Int).with_column("CYCLEEID"),
                        FieldDef::new("cycle_id", Int).with_column("INDEX"),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("workplace_id", Int).with_column("WORKPLACID"),
                    ]),
            )
            .table(
                TableDef::new("5CYEXC")
                    .with_description("Cycle scheduling exceptions")
                    .optional()
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("cycle_assignment_id", Int).with_column("CYCLEASSID"),
                        FieldDef::new("date", Date),
                        FieldDef::new("type", Text),
                    ]),
            )
            .table(
                TableDef::new("5HOLID")
                    .with_description("Public holidays")
                    .with_fields([
                        id(),
                        FieldDef::new("date", Date),
                        FieldDef::required("name", Text),
                        FieldDef::new("interval", Int),
                    ]),
            )
            .table(
                TableDef::new("5HOBAN")
                    .with_description("Leave restriction periods per group")
                    .with_fields([
                        id(),
                        FieldDef::new("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("holiday_id", Int).with_column("HOLIDAYID"),
                        FieldDef::new("start", Date),
                        FieldDef::new("end", Date),
                        FieldDef::new("status", Text),
                    ]),
            )
            .table(
                TableDef::new("5PERIO")
                    .with_description("Special periods per group")
                    .with_fields([
                        id(),
                        FieldDef::new("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("start", Text),
                        FieldDef::new("end", Text),
                        FieldDef::new("color", Int),
                        FieldDef::new("descript", Text),
                    ]),
            )
            .table(
                TableDef::new("5RESTR")
                    .with_description("Per-employee shift restrictions")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("weekday", Int),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("restrict", Int),
                    ]),
            )
            .table(
                TableDef::new("5SHDEM")
                    .with_description("Weekly staffing demands")
                    .with_fields([
                        id(),
                        FieldDef::new("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("weekday", Int),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("workplace_id", Int).with_column("WORKPLACID"),
                        FieldDef::new("min_staff", Int).with_column("MIN"),
                        FieldDef::new("max_staff", Int).with_column("MAX"),
                    ]),
            )
            .table(
                TableDef::new("5SPDEM")
                    .with_description("Date-specific staffing overrides")
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("demand", Text),
                        FieldDef::new("date", Date),
                        FieldDef::new("notes", Text),
                    ]),
            )
            .table(
                TableDef::new("5DADEM")
                    .with_description("Daily staffing demands")
                    .optional()
                    .with_fields([
                        id(),
                        FieldDef::new("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("weekday", Int),
                        FieldDef::new("shift_id", Int).with_column("SHIFTID"),
                        FieldDef::new("workplace_id", Int).with_column("WORKPLACID"),
                        FieldDef::new("min_staff", Int).with_column("MIN"),
                        FieldDef::new("max_staff", Int).with_column("MAX"),
                    ]),
            )
            .table(
                TableDef::new("5USER")
                    .with_description("System users")
                    .with_fields([
                        id(),
                        FieldDef::new("position", Int),
                        FieldDef::required("name", Text),
                        FieldDef::new("description", Text).with_column("DESCRIP"),
                        FieldDef::new("admin", Int),
                        FieldDef::new("rights", Text),
                        FieldDef::new("category", Text),
                    ]),
            )
            .table(
                TableDef::new("5USETT")
                    .with_description("Global user settings")
                    .optional()
                    .with_fields([
                        id(),
                        FieldDef::new("login", Text),
                        FieldDef::new("category", Text).with_column("SPSHCAT"),
                        FieldDef::new("overtime_category", Text).with_column("OVERTCAT"),
                        FieldDef::new("anonymous_name", Text).with_column("ANOANAME"),
                    ]),
            )
            .table(
                TableDef::new("5EMACC")
                    .with_description("Per-employee access rights")
                    .with_fields([
                        id(),
                        FieldDef::new("user_id", Int).with_column("USERID"),
                        employee_id(),
                        FieldDef::new("access_code", Text).with_column("ACCESSCODE"),
                        FieldDef::new("value", Text),
                    ]),
            )
            .table(
                TableDef::new("5GRACC")
                    .with_description("Per-group access rights")
                    .with_fields([
                        id(),
                        FieldDef::new("user_id", Int).with_column("USERID"),
                        FieldDef::new("group_id", Int).with_column("GROUPID"),
                        FieldDef::new("access_code", Text).with_column("ACCESSCODE"),
                        FieldDef::new("value", Text),
                    ]),
            )
            .table(
                TableDef::new("5BOOK")
                    .with_description("Hour bookings")
                    .optional()
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("date", Date),
                        FieldDef::new("type", Int),
                        FieldDef::new("value", Float),
                        FieldDef::new("note", Text),
                    ]),
            )
            .table(
                TableDef::new("5OVER")
                    .with_description("Overtime records")
                    .optional()
                    .with_fields([
                        id(),
                        employee_id(),
                        FieldDef::new("date", Date),
                        FieldDef::new("hours", Float),
                    ]),
            )
            .table(
                TableDef::new("5BUILD")
                    .with_description("Archive build information")
                    .optional()
                    .with_fields([
                        id(),
                        FieldDef::new("build", Text),
                        FieldDef::new("change", Text),
                        FieldDef::new("description", Text).with_column("DESCRIPTIO"),
                    ]),
            )
            .table(
                TableDef::new("5XCHAR")
                    .with_description("Surcharge rules")
                    .optional()
                    .with_fields([
                        id(),
                        FieldDef::required("name", Text),
                        FieldDef::new("position", Int),
                        FieldDef::new("start", Int),
                        FieldDef::new("end", Int),
                        FieldDef::new("validity", Int),
                        FieldDef::new("validdays", Text),
                        FieldDef::new("holrule", Int),
                        FieldDef::new("date", Date),
                        FieldDef::new("hide", Int),
                    ]),
            );

        let builder = builder
            // Employee relations
            .relation(rel("employee_absences", "5EMPL", "5ABSEN"))
            .relation(rel("employee_shift_details", "5EMPL", "5SPSHI"))
            .relation(rel("employee_shifts", "5EMPL", "5MASHI"))
            .relation(rel("employee_notes", "5EMPL", "5NOTE"))
            .relation(rel("employee_groups", "5EMPL", "5GRASG"))
            .relation(rel("employee_leave_entitlements", "5EMPL", "5LEAEN"))
            .relation(rel("employee_cycle_assignments", "5EMPL", "5CYASS"))
            .relation(rel("employee_cycle_exceptions", "5EMPL", "5CYEXC"))
            .relation(rel("employee_bookings", "5EMPL", "5BOOK"))
            .relation(rel("employee_overtime", "5EMPL", "5OVER"))
            .relation(rel("employee_restrictions", "5EMPL", "5RESTR"))
            .relation(rel("employee_access", "5EMPL", "5EMACC"))
            .relation(rel("employee_plan_demands", "5EMPL", "5SPDEM"))
            // Group relations
            .relation(RelationDef::one_to_many(
                "group_assignments",
                "5GROUP",
                "id",
                "5GRASG",
                "group_id",
            ))
            .relation(RelationDef::many_to_one(
                "group_parent",
                "5GROUP",
                "superid",
                "5GROUP",
                "id",
            ))
            .relation(RelationDef::one_to_many(
                "group_access",
                "5GROUP",
                "id",
                "5GRACC",
                "group_id",
            ))
            .relation(RelationDef::one_to_many(
                "group_periods",
                "5GROUP",
                "id",
                "5PERIO",
                "group_id",
            ))
            .relation(RelationDef::one_to_many(
                "group_holiday_bans",
                "5GROUP",
                "id",
                "5HOBAN",
                "group_id",
            ))
            .relation(RelationDef::one_to_many(
                "group_shift_demands",
                "5GROUP",
                "id",
                "5SHDEM",
                "group_id",
            ))
            .relation(RelationDef::one_to_many(
                "group_day_demands",
                "5GROUP",
                "id",
                "5DADEM",
                "group_id",
            ))
            // Shift relations
            .relation(fk_rel("shift_details", "5SHIFT", "5SPSHI", "shift_id"))
            .relation(fk_rel("shift_assignments", "5SHIFT", "5MASHI", "shift_id"))
            .relation(fk_rel("shift_restrictions", "5SHIFT", "5RESTR", "shift_id"))
            .relation(fk_rel("shift_demands", "5SHIFT", "5SHDEM", "shift_id"))
            .relation(fk_rel("shift_day_demands", "5SHIFT", "5DADEM", "shift_id"))
            .relation(fk_rel("shift_plan_demands", "5SHIFT", "5SPDEM", "shift_id"))
            .relation(fk_rel("shift_cycle_entitlements", "5SHIFT", "5CYENT", "shift_id"))
            // Work location relations
            .relation(fk_rel("workplace_details", "5WOPL", "5SPSHI", "workplace_id"))
            .relation(fk_rel("workplace_assignments", "5WOPL", "5MASHI", "workplace_id"))
            .relation(fk_rel("workplace_demands", "5WOPL", "5SHDEM", "workplace_id"))
            // Leave type relations
            .relation(fk_rel("leave_type_absences", "5LEAVT", "5ABSEN", "leave_type_id"))
            .relation(fk_rel(
                "leave_type_entitlements",
                "5LEAVT",
                "5LEAEN",
                "leave_type_id",
            ))
            // Cycle relations
            .relation(fk_rel("cycle_assignments", "5CYCLE", "5CYASS", "cycle_id"))
            .relation(fk_rel("cycle_entitlements", "5CYCLE", "5CYENT", "cycle_id"))
            .relation(fk_rel(
                "cycle_assignment_exceptions",
                "5CYASS",
                "5CYEXC",
                "cycle_assignment_id",
            ))
            // User relations
            .relation(fk_rel("user_employee_access", "5USER", "5EMACC", "user_id"))
            .relation(fk_rel("user_group_access", "5USER", "5GRACC", "user_id"))
            // Holiday relations
            .relation(fk_rel("holiday_bans", "5HOLID", "5HOBAN", "holiday_id"));

        builder.build().expect("standard catalog is valid")
    }
}

/// One-to-many from `source.id` to `target.employee_id`-style FK fields.
fn rel(name: &str, source: &str, target: &str) -> RelationDef {
    RelationDef::one_to_many(name, source, "id", target, "employee_id")
}

fn fk_rel(name: &str, source: &str, target: &str, fk_field: &str) -> RelationDef {
    RelationDef::one_to_many(name, source, "id", target, fk_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_builds() {
        let catalog = Catalog::standard();
        assert!(catalog.tables().len() >= 29);
        assert!(catalog.contains("5EMPL"));
        assert!(catalog.contains("5XCHAR"));
        assert!(catalog.relation("employee_absences").is_ok());
    }

    #[test]
    fn test_standard_order_respects_dependencies() {
        let catalog = Catalog::standard();
        let order = catalog.dependency_order();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

        for relation in catalog.relations() {
            if relation.is_self_relation() {
                continue;
            }
            let (fk_table, _) = relation.fk_side();
            let (key_table, _) = relation.key_side();
            assert!(
                pos(key_table) < pos(fk_table),
                "{key_table} must load before {fk_table}"
            );
        }
    }

    #[test]
    fn test_standard_levels_start_with_independents() {
        let catalog = Catalog::standard();
        let first = &catalog.dependency_levels()[0];
        assert!(first.contains(&"5EMPL".to_string()));
        assert!(first.contains(&"5SHIFT".to_string()));
        assert!(!first.contains(&"5ABSEN".to_string()));
    }

    #[test]
    fn test_fk_columns_fit_dbf_limit() {
        for table in Catalog::standard().tables() {
            for field in &table.fields {
                assert!(
                    field.column.len() <= 10,
                    "{}.{} column {} exceeds the DBF header limit",
                    table.name,
                    field.name,
                    field.column
                );
            }
        }
    }
}
