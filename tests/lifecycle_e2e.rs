mod common;

use std::collections::HashMap;

use common::{customer, Customer, Invoice, Order, Review};
use docmap::{Entity, EntityId, Index, Lifecycle, ValidationError, Value};

fn invoice(index: &Index, customer: &Customer, number: &str) -> docmap::DocResult<Invoice> {
    let mut invoice: Invoice = index.create();
    invoice.customer.set_value(Some(customer.clone()));
    invoice.number = number.to_string();
    index.update(&mut invoice)?;
    Ok(invoice)
}

#[test]
fn new_and_exists_follow_persistence() {
    let index = Index::in_memory();
    let mut acme: Customer = index.create();
    assert!(acme.is_new());
    assert!(!acme.exists());
    assert_eq!(acme.status, "active");
    assert_eq!(acme.version(), 0);

    acme.name = "ACME".to_string();
    index.update(&mut acme).unwrap();
    assert!(!acme.is_new());
    assert!(acme.exists());
    assert!(!acme.is_deleted());
    assert_eq!(acme.version(), 1);

    index.delete(&mut acme).unwrap();
    assert!(acme.is_deleted());
    assert!(!acme.exists());
    assert!(index.find::<Customer>(acme.id().unwrap()).unwrap().is_none());
}

#[test]
fn internal_hooks_run_before_application_hooks() {
    let index = Index::in_memory();
    let mut acme: Customer = index.create();
    acme.name = "  ACME  ".to_string();
    index.update(&mut acme).unwrap();

    assert_eq!(acme.hook_log, vec!["internal", "application"]);
    let stored = index.find::<Customer>(acme.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.name, "ACME");
}

#[test]
fn missing_required_field_rejects_save() {
    let index = Index::in_memory();
    let mut nameless: Customer = index.create();

    let err = index.update(&mut nameless).unwrap_err();
    assert!(err.is_validation());
    assert!(err.is_user_facing());
    let failure = err.as_validation().unwrap();
    assert!(matches!(
        &failure.first,
        ValidationError::FieldMustBeFilled { field, .. } if field == "name"
    ));
    assert_eq!(err.to_string(), "Validation error: Field 'name' of customer must be filled");

    // Hooks run first so the checks see their output.
    assert!(nameless.is_new());
    assert_eq!(nameless.hook_log, vec!["internal", "application"]);
    assert_eq!(index.select::<Customer>().count().unwrap(), 0);
}

#[test]
fn all_properties_are_checked_and_first_error_wins() {
    let index = Index::in_memory();
    let mut orphan: Invoice = index.create();

    let err = index.update(&mut orphan).unwrap_err();
    let failure = err.as_validation().unwrap();
    assert_eq!(failure.first.field(), "customer");
    assert!(failure.has_field_error("customer"));
    assert!(failure.has_field_error("number"));
    assert_eq!(failure.field_errors.len(), 2);
}

#[test]
fn duplicate_unique_value_is_rejected() {
    let index = Index::in_memory();
    let mut acme = customer(&index, "ACME");

    let mut copy: Customer = index.create();
    copy.name = "ACME".to_string();
    let err = index.update(&mut copy).unwrap_err();
    let failure = err.as_validation().unwrap();
    assert_eq!(
        failure.first,
        ValidationError::FieldMustBeUnique {
            entity_type: "customer".to_string(),
            field: "name".to_string(),
            value: "ACME".to_string(),
        }
    );
    assert_eq!(failure.field_errors[0].value.as_deref(), Some("ACME"));
    assert!(copy.is_new());

    // The entity itself does not count as a duplicate.
    index.update(&mut acme).unwrap();
    assert_eq!(acme.version(), 2);
}

#[test]
fn normalizing_hook_cannot_bypass_uniqueness() {
    let index = Index::in_memory();
    customer(&index, "ACME");

    let mut padded: Customer = index.create();
    padded.name = "  ACME  ".to_string();
    let err = index.update(&mut padded).unwrap_err();
    assert!(matches!(
        &err.as_validation().unwrap().first,
        ValidationError::FieldMustBeUnique { value, .. } if value == "ACME"
    ));
    assert!(padded.is_new());

    let stored = index.select::<Customer>().eq("name", "ACME").count().unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn unique_within_scopes_the_check() {
    let index = Index::in_memory();
    let acme = customer(&index, "ACME");
    let globex = customer(&index, "Globex");

    invoice(&index, &acme, "2024-1").unwrap();
    invoice(&index, &globex, "2024-1").unwrap();

    let err = invoice(&index, &acme, "2024-1").unwrap_err();
    assert_eq!(err.as_validation().unwrap().first.field(), "number");
}

#[test]
fn try_update_detects_concurrent_changes() {
    let index = Index::in_memory();
    let acme = customer(&index, "ACME");
    let id = acme.id().unwrap();

    let mut first = index.find::<Customer>(id).unwrap().unwrap();
    let mut second = index.find::<Customer>(id).unwrap().unwrap();

    first.city = Some("Berlin".to_string());
    index.try_update(&mut first).unwrap();
    assert_eq!(first.version(), 2);

    second.city = Some("Paris".to_string());
    let err = index.try_update(&mut second).unwrap_err();
    assert!(err.is_storage());
    assert!(err.is_retryable());
    assert_eq!(second.version(), 1);

    // Unchecked updates always win.
    index.update(&mut second).unwrap();
    assert_eq!(second.version(), 3);
}

#[test]
fn loaded_entities_track_changes() {
    let index = Index::in_memory();
    let mut acme: Customer = index.create();
    acme.name = "ACME".to_string();
    assert!(!acme.meta.is_changed("name", &Value::from("other")));
    index.update(&mut acme).unwrap();

    let loaded = index.find::<Customer>(acme.id().unwrap()).unwrap().unwrap();
    assert!(loaded.meta.has_source());
    assert!(!loaded.meta.is_changed("name", &Value::from("ACME")));
    assert!(loaded.meta.is_changed("name", &Value::from("ACME Corp")));
    assert!(!loaded.meta.is_changed("city", &Value::Null));
    assert!(loaded.meta.is_changed("city", &Value::from("Berlin")));
}

#[test]
fn loaded_copies_are_equal_by_id() {
    let index = Index::in_memory();
    let acme = customer(&index, "ACME");
    let a = index.find::<Customer>(acme.id().unwrap()).unwrap().unwrap();
    let b = index.find::<Customer>(acme.id().unwrap()).unwrap().unwrap();
    assert_eq!(a.meta, b.meta);
    assert_ne!(a.meta, customer(&index, "Globex").meta);
}

#[test]
fn blocking_relation_aborts_delete_before_cascades() {
    let index = Index::in_memory();
    let mut acme = customer(&index, "ACME");

    let mut order: Order = index.create();
    order.customer.set_value(Some(acme.clone()));
    index.update(&mut order).unwrap();
    let mut invoice = invoice(&index, &acme, "2024-1").unwrap();

    let err = index.delete(&mut acme).unwrap_err();
    assert!(err.is_referential_integrity());
    assert!(err.to_string().contains("invoice.customer"));
    assert!(acme.exists());
    assert!(index.find::<Customer>(acme.id().unwrap()).unwrap().is_some());
    assert!(index.find::<Order>(order.id().unwrap()).unwrap().is_some());

    index.delete(&mut invoice).unwrap();
    index.delete(&mut acme).unwrap();
    assert!(index.find::<Order>(order.id().unwrap()).unwrap().is_none());
}

#[test]
fn set_null_relation_clears_reference() {
    let index = Index::in_memory();
    let mut acme = customer(&index, "ACME");

    let mut review: Review = index.create();
    review.customer.set_value(Some(acme.clone()));
    review.text = "great".to_string();
    index.update(&mut review).unwrap();

    index.delete(&mut acme).unwrap();
    let review = index.find::<Review>(review.id().unwrap()).unwrap().unwrap();
    assert!(!review.customer.is_filled());
    assert_eq!(review.text, "great");
    assert_eq!(review.version(), 2);
}

#[test]
fn deleting_a_new_entity_does_nothing() {
    let index = Index::in_memory();
    let mut draft: Customer = index.create();
    index.delete(&mut draft).unwrap();
    assert!(draft.is_new());
    assert!(!draft.is_deleted());
}

#[test]
fn derived_fields_follow_the_referenced_entity() {
    let index = Index::in_memory();
    let mut acme = customer(&index, "ACME");

    let mut order: Order = index.create();
    order.customer.set_value(Some(acme.clone()));
    order.amount = 42;
    index.update(&mut order).unwrap();
    assert_eq!(order.customer_name.as_deref(), Some("ACME"));

    acme.name = "ACME Corp".to_string();
    index.update(&mut acme).unwrap();

    let order = index.find::<Order>(order.id().unwrap()).unwrap().unwrap();
    assert_eq!(order.customer_name.as_deref(), Some("ACME Corp"));
    assert_eq!(order.amount, 42);
}

#[test]
fn dangling_reference_leaves_derived_field_alone() {
    let index = Index::in_memory();
    let mut order: Order = index.create();
    order.customer.set_id(Some(EntityId::from("gone")));
    order.customer_name = Some("cached".to_string());

    index.update(&mut order).unwrap();
    assert_eq!(order.customer_name.as_deref(), Some("cached"));
}

#[test]
fn load_form_reports_changed_fields_only() {
    let index = Index::in_memory();
    let mut acme: Customer = index.create();
    acme.name = "ACME".to_string();

    let form: HashMap<String, String> = [
        ("name", "ACME"),
        ("city", "Berlin"),
        ("status", "blocked"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let changes = acme.load_form(&form, &["name", "city"]);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes["city"], (Value::Null, Value::from("Berlin")));
    assert_eq!(acme.city.as_deref(), Some("Berlin"));
    assert_eq!(acme.status, "active");

    let cleared: HashMap<String, String> = [("city".to_string(), String::new())].into_iter().collect();
    let changes = acme.load_form(&cleared, &["city"]);
    assert_eq!(changes["city"], (Value::from("Berlin"), Value::Null));
    assert_eq!(acme.city, None);
}

#[test]
fn unique_id_and_describe() {
    let index = Index::in_memory();
    let mut acme: Customer = index.create();
    acme.name = "ACME".to_string();
    assert_eq!(acme.unique_id(), None);
    assert_eq!(
        acme.describe(),
        "new (Version: 0) {name: 'ACME', city: '', status: 'active', favorites: ''}"
    );

    index.update(&mut acme).unwrap();
    let id = acme.id().unwrap().clone();
    assert_eq!(acme.unique_id(), Some(format!("customer-{id}")));
    assert!(acme.describe().starts_with(&format!("{id} (Version: 1) {{name: 'ACME'")));
}

#[derive(Debug, Default, Clone)]
struct Shipment {
    meta: docmap::EntityMeta,
    customer: docmap::EntityRef<Customer>,
    label: Option<String>,
}

fn shipment_customer(s: &Shipment) -> &docmap::EntityRef<Customer> {
    &s.customer
}

fn shipment_customer_mut(s: &mut Shipment) -> &mut docmap::EntityRef<Customer> {
    &mut s.customer
}

impl Entity for Shipment {
    fn descriptor() -> &'static docmap::EntityDescriptor<Self> {
        static DESCRIPTOR: std::sync::OnceLock<docmap::EntityDescriptor<Shipment>> =
            std::sync::OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            docmap::EntityDescriptor::builder("shipment")
                .property(docmap::Property::reference(
                    "customer",
                    shipment_customer,
                    shipment_customer_mut,
                ))
                .property(
                    docmap::Property::new(
                        "label",
                        |s: &Shipment| Value::from(s.label.clone()),
                        |s: &mut Shipment, v| s.label = v.as_string().map(str::to_string),
                    )
                    .derived(docmap::DerivedField::through(
                        "customer",
                        "no_such_field",
                        shipment_customer_mut,
                    )),
                )
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &docmap::EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut docmap::EntityMeta {
        &mut self.meta
    }
}

#[test]
fn failing_derived_field_does_not_abort_the_save() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let index = Index::in_memory();
    let acme = customer(&index, "ACME");

    let mut shipment: Shipment = index.create();
    shipment.customer.set_value(Some(acme));
    shipment.label = Some("manual".to_string());
    index.update(&mut shipment).unwrap();

    assert!(shipment.exists());
    assert_eq!(shipment.label.as_deref(), Some("manual"));
}

#[derive(Debug, Default, Clone)]
struct Team {
    meta: docmap::EntityMeta,
    name: String,
    captain: docmap::EntityRef<Player>,
    captain_name: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct Player {
    meta: docmap::EntityMeta,
    name: String,
    team: docmap::EntityRef<Team>,
    team_name: Option<String>,
}

fn team_captain(t: &Team) -> &docmap::EntityRef<Player> {
    &t.captain
}

fn team_captain_mut(t: &mut Team) -> &mut docmap::EntityRef<Player> {
    &mut t.captain
}

fn player_team(p: &Player) -> &docmap::EntityRef<Team> {
    &p.team
}

fn player_team_mut(p: &mut Player) -> &mut docmap::EntityRef<Team> {
    &mut p.team
}

impl Entity for Team {
    fn descriptor() -> &'static docmap::EntityDescriptor<Self> {
        static DESCRIPTOR: std::sync::OnceLock<docmap::EntityDescriptor<Team>> =
            std::sync::OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            docmap::EntityDescriptor::builder("team")
                .property(docmap::Property::new(
                    "name",
                    |t: &Team| Value::from(t.name.clone()),
                    |t: &mut Team, v| t.name = v.to_user_string(),
                ))
                .property(docmap::Property::reference("captain", team_captain, team_captain_mut))
                .property(
                    docmap::Property::new(
                        "captain_name",
                        |t: &Team| Value::from(t.captain_name.clone()),
                        |t: &mut Team, v| t.captain_name = v.as_string().map(str::to_string),
                    )
                    .derived(docmap::DerivedField::through("captain", "name", team_captain_mut)),
                )
                .referenced_by(docmap::RefRelation::new(
                    "team",
                    player_team_mut,
                    docmap::OnDelete::SetNull,
                ))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &docmap::EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut docmap::EntityMeta {
        &mut self.meta
    }
}

impl Entity for Player {
    fn descriptor() -> &'static docmap::EntityDescriptor<Self> {
        static DESCRIPTOR: std::sync::OnceLock<docmap::EntityDescriptor<Player>> =
            std::sync::OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            docmap::EntityDescriptor::builder("player")
                .property(docmap::Property::new(
                    "name",
                    |p: &Player| Value::from(p.name.clone()),
                    |p: &mut Player, v| p.name = v.to_user_string(),
                ))
                .property(docmap::Property::reference("team", player_team, player_team_mut))
                .property(
                    docmap::Property::new(
                        "team_name",
                        |p: &Player| Value::from(p.team_name.clone()),
                        |p: &mut Player, v| p.team_name = v.as_string().map(str::to_string),
                    )
                    .derived(docmap::DerivedField::through("team", "name", player_team_mut)),
                )
                .referenced_by(docmap::RefRelation::new(
                    "captain",
                    team_captain_mut,
                    docmap::OnDelete::SetNull,
                ))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &docmap::EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut docmap::EntityMeta {
        &mut self.meta
    }
}

#[test]
fn mutually_derived_fields_settle() {
    let index = Index::in_memory();
    let mut reds: Team = index.create();
    reds.name = "Reds".to_string();
    index.update(&mut reds).unwrap();

    let mut ann: Player = index.create();
    ann.name = "Ann".to_string();
    ann.team.set_value(Some(reds.clone()));
    index.update(&mut ann).unwrap();
    assert_eq!(ann.team_name.as_deref(), Some("Reds"));

    // Each side now mirrors the other.
    reds.captain.set_value(Some(ann.clone()));
    index.update(&mut reds).unwrap();
    assert_eq!(reds.captain_name.as_deref(), Some("Ann"));
    assert_eq!(reds.version(), 2);
    let stored = index.find::<Player>(ann.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.version(), 1);

    ann.name = "Anna".to_string();
    index.update(&mut ann).unwrap();
    let stored = index.find::<Team>(reds.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.captain_name.as_deref(), Some("Anna"));
    assert_eq!(stored.version(), 3);

    // Unchanged mirrors are not saved again.
    index.update(&mut ann).unwrap();
    let stored = index.find::<Team>(reds.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.version(), 3);

    let mut reds = index.find::<Team>(reds.id().unwrap()).unwrap().unwrap();
    reds.name = "Blues".to_string();
    index.update(&mut reds).unwrap();
    assert_eq!(reds.version(), 4);
    let stored = index.find::<Player>(ann.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.team_name.as_deref(), Some("Blues"));
    assert_eq!(stored.version(), 4);
    let stored = index.find::<Team>(reds.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.version(), 4);
}
