//! Test fixtures for comparator integration tests
//!
//! Small shop-like schemas built through the snapshot builder API. Each
//! builder returns the snapshot together with the handles tests need.

#![allow(dead_code)]

use schemadelta_core::{ObjectId, Snapshot};

/// Handles into a [`users_with_unique`] snapshot
pub struct UsersFixture {
    pub snapshot: Snapshot,
    pub table: ObjectId,
    pub columns: Vec<ObjectId>,
    pub constraint: ObjectId,
}

/// Table `users(tenant_id, email, name)` with one unique constraint
///
/// `constrained` names the constraint's columns, in order, with whatever
/// case the caller wants.
pub fn users_with_unique(label: &str, table: &str, name: Option<&str>, constrained: &[&str]) -> UsersFixture {
    let mut snapshot = Snapshot::new(label);
    let schema = snapshot.add_schema(None, "public");
    let users = snapshot.add_table(Some(schema), table);
    let columns: Vec<ObjectId> = ["tenant_id", "email", "name"]
        .iter()
        .map(|c| snapshot.add_column(users, c, "varchar(255)"))
        .collect();

    let chosen: Vec<ObjectId> = constrained
        .iter()
        .map(|wanted| {
            let position = ["tenant_id", "email", "name"]
                .iter()
                .position(|c| c.eq_ignore_ascii_case(wanted.trim()))
                .expect("fixture column");
            columns[position]
        })
        .collect();
    let constraint = snapshot.add_unique_constraint(users, name, &chosen);

    // Rename the constrained columns to the case the caller used
    for (id, wanted) in chosen.iter().zip(constrained) {
        if let Some(column) = snapshot.get_mut(*id) {
            column.name = Some(wanted.to_string());
        }
    }

    UsersFixture {
        snapshot,
        table: users,
        columns,
        constraint,
    }
}

/// `public.users`, `public.orders` with keys, a foreign key and an index
pub fn shop(label: &str) -> Snapshot {
    let mut snapshot = Snapshot::new(label);
    let public = snapshot.add_schema(None, "public");

    let users = snapshot.add_table(Some(public), "users");
    let user_id = snapshot.add_column(users, "id", "bigint");
    let email = snapshot.add_column(users, "email", "varchar(255)");
    snapshot.add_primary_key(users, Some("users_pkey"), &[user_id]);
    snapshot.add_unique_constraint(users, Some("users_email_key"), &[email]);

    let orders = snapshot.add_table(Some(public), "orders");
    let order_id = snapshot.add_column(orders, "id", "bigint");
    let order_user = snapshot.add_column(orders, "user_id", "bigint");
    snapshot.add_column(orders, "total", "numeric(10,2)");
    snapshot.add_primary_key(orders, Some("orders_pkey"), &[order_id]);
    snapshot.add_foreign_key(orders, Some("orders_user_id_fkey"), &[order_user], users, &[user_id]);
    snapshot.add_index(orders, Some("idx_orders_user"), &[order_user], false);

    snapshot
}

/// The same shop under another schema name, e.g. `dev` vs `prod`
pub fn shop_in_schema(label: &str, schema: &str) -> Snapshot {
    let mut snapshot = shop(label);
    if let Some(object) = snapshot.get_mut(ObjectId(0)) {
        object.name = Some(schema.to_string());
    }
    snapshot
}

/// Find an object by display path
pub fn find(snapshot: &Snapshot, path: &str) -> ObjectId {
    snapshot
        .iter()
        .find(|o| o.display_path() == path)
        .map(|o| o.id)
        .unwrap_or_else(|| panic!("no object at {}", path))
}
