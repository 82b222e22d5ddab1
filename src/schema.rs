//! Diesel table declarations for the `inodes` and `pages` tables.
//!
//! `inode_path(id)` is a SQL function, not a table, and is invoked directly
//! via `diesel::sql_query` in `db::inodes` rather than declared here.

diesel::table! {
    inodes (id) {
        id -> Int8,
        owner_id -> Text,
        inode_type -> Text,
        name -> Text,
        path -> Text,
        is_indexed -> Bool,
        is_uploaded -> Bool,
        is_ingested -> Bool,
        is_embedded -> Bool,
        is_public -> Bool,
        should_move -> Bool,
        from_page -> Int4,
        to_page -> Nullable<Int4>,
        error -> Nullable<Text>,
        parent_id -> Nullable<Int8>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use pgvector::sql_types::Vector;

    pages (id) {
        id -> Int8,
        inode_id -> Int8,
        index -> Int4,
        contents -> Text,
        embedding -> Nullable<Vector>,
    }
}

diesel::joinable!(pages -> inodes (inode_id));
diesel::allow_tables_to_appear_in_same_query!(inodes, pages);
