#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use docmap::{
    DerivedField, Document, DocumentStore, DocumentWrite, Entity, EntityDescriptor, EntityId,
    EntityMeta, EntityRef, EntityRefList, InMemoryDocumentStore, Index, IndexConfig, OnDelete,
    Property, RefRelation, SearchRequest, StorageError, Unique, Value,
};

fn text(value: &Value) -> String {
    value.as_string().unwrap_or_default().to_string()
}

fn optional_text(value: &Value) -> Option<String> {
    value.as_string().map(str::to_string)
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Customer {
    pub meta: EntityMeta,
    pub name: String,
    pub city: Option<String>,
    pub status: String,
    pub favorites: EntityRefList<Product>,
    pub hook_log: Vec<&'static str>,
}

fn customer_favorites(c: &Customer) -> &EntityRefList<Product> {
    &c.favorites
}

fn customer_favorites_mut(c: &mut Customer) -> &mut EntityRefList<Product> {
    &mut c.favorites
}

impl Entity for Customer {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Customer>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder("customer")
                .property(
                    Property::new(
                        "name",
                        |c: &Customer| Value::from(c.name.clone()),
                        |c: &mut Customer, v| c.name = text(&v),
                    )
                    .not_null()
                    .unique(Unique::global()),
                )
                .property(Property::new(
                    "city",
                    |c: &Customer| Value::from(c.city.clone()),
                    |c: &mut Customer, v| c.city = optional_text(&v),
                ))
                .property(
                    Property::new(
                        "status",
                        |c: &Customer| Value::from(c.status.clone()),
                        |c: &mut Customer, v| c.status = text(&v),
                    )
                    .init_with(|c: &mut Customer| c.status = "active".to_string()),
                )
                .property(Property::reference_list(
                    "favorites",
                    customer_favorites,
                    customer_favorites_mut,
                ))
                .internal_hook(|c: &mut Customer, _| {
                    c.hook_log.push("internal");
                    Ok(())
                })
                .save_hook(|c: &mut Customer, _| {
                    c.hook_log.push("application");
                    c.name = c.name.trim().to_string();
                    Ok(())
                })
                .referenced_by(RefRelation::new("customer", order_customer_mut, OnDelete::Cascade))
                .referenced_by(RefRelation::new("customer", invoice_customer_mut, OnDelete::Reject))
                .referenced_by(RefRelation::new("customer", review_customer_mut, OnDelete::SetNull))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

// ---------------------------------------------------------------------------
// Order: cascades with its customer, mirrors the customer's name
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Order {
    pub meta: EntityMeta,
    pub customer: EntityRef<Customer>,
    pub customer_name: Option<String>,
    pub amount: i64,
}

fn order_customer(o: &Order) -> &EntityRef<Customer> {
    &o.customer
}

fn order_customer_mut(o: &mut Order) -> &mut EntityRef<Customer> {
    &mut o.customer
}

impl Entity for Order {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Order>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder("order")
                .property(Property::reference("customer", order_customer, order_customer_mut))
                .property(
                    Property::new(
                        "customer_name",
                        |o: &Order| Value::from(o.customer_name.clone()),
                        |o: &mut Order, v| o.customer_name = optional_text(&v),
                    )
                    .derived(DerivedField::through("customer", "name", order_customer_mut)),
                )
                .property(Property::new(
                    "amount",
                    |o: &Order| Value::from(o.amount),
                    |o: &mut Order, v| o.amount = v.as_int().unwrap_or_default(),
                ))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

// ---------------------------------------------------------------------------
// Invoice: blocks deleting its customer, number unique per customer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Invoice {
    pub meta: EntityMeta,
    pub customer: EntityRef<Customer>,
    pub number: String,
}

fn invoice_customer(i: &Invoice) -> &EntityRef<Customer> {
    &i.customer
}

fn invoice_customer_mut(i: &mut Invoice) -> &mut EntityRef<Customer> {
    &mut i.customer
}

impl Entity for Invoice {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Invoice>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder("invoice")
                .property(
                    Property::reference("customer", invoice_customer, invoice_customer_mut)
                        .not_null(),
                )
                .property(
                    Property::new(
                        "number",
                        |i: &Invoice| Value::from(i.number.clone()),
                        |i: &mut Invoice, v| i.number = text(&v),
                    )
                    .not_null()
                    .unique(Unique::within("customer")),
                )
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

// ---------------------------------------------------------------------------
// Review: loses its customer reference when the customer is deleted
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Review {
    pub meta: EntityMeta,
    pub customer: EntityRef<Customer>,
    pub text: String,
}

fn review_customer(r: &Review) -> &EntityRef<Customer> {
    &r.customer
}

fn review_customer_mut(r: &mut Review) -> &mut EntityRef<Customer> {
    &mut r.customer
}

impl Entity for Review {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Review>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder("review")
                .property(Property::reference("customer", review_customer, review_customer_mut))
                .property(Property::new(
                    "text",
                    |r: &Review| Value::from(r.text.clone()),
                    |r: &mut Review, v| r.text = text(&v),
                ))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct Product {
    pub meta: EntityMeta,
    pub name: String,
    pub description: String,
}

impl Entity for Product {
    fn descriptor() -> &'static EntityDescriptor<Self> {
        static DESCRIPTOR: OnceLock<EntityDescriptor<Product>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::builder("product")
                .property(Property::new(
                    "name",
                    |p: &Product| Value::from(p.name.clone()),
                    |p: &mut Product, v| p.name = text(&v),
                ))
                .property(Property::new(
                    "description",
                    |p: &Product| Value::from(p.description.clone()),
                    |p: &mut Product, v| p.description = text(&v),
                ))
                .build()
                .unwrap()
        })
    }

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

// ---------------------------------------------------------------------------
// Store wrapper counting backend calls
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryDocumentStore,
    gets: AtomicUsize,
    searches: AtomicUsize,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

impl DocumentStore for CountingStore {
    fn get(&self, doc_type: &str, id: &EntityId) -> Result<Option<Document>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(doc_type, id)
    }

    fn put(&self, doc_type: &str, write: DocumentWrite) -> Result<Document, StorageError> {
        self.inner.put(doc_type, write)
    }

    fn delete(&self, doc_type: &str, id: &EntityId) -> Result<bool, StorageError> {
        self.inner.delete(doc_type, id)
    }

    fn search(&self, doc_type: &str, request: &SearchRequest) -> Result<Vec<Document>, StorageError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(doc_type, request)
    }
}

pub fn counting_index() -> (Index, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    let index = Index::new(store.clone(), IndexConfig::default()).unwrap();
    (index, store)
}

pub fn customer(index: &Index, name: &str) -> Customer {
    let mut customer: Customer = index.create();
    customer.name = name.to_string();
    index.update(&mut customer).unwrap();
    customer
}

pub fn product(index: &Index, name: &str) -> Product {
    let mut product: Product = index.create();
    product.name = name.to_string();
    index.update(&mut product).unwrap();
    product
}
