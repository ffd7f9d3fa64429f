// Mirrors the tables created by `DbContext::init_schema`.

diesel::table! {
    documents (id) {
        id -> Text,
        title -> Text,
        content -> Nullable<Text>,
        ocr_confidence -> Nullable<Float>,
        file_name -> Text,
        content_type -> Text,
        file_size -> BigInt,
        storage_path -> Text,
        content_hash -> Text,
        owner_id -> Text,
        department -> Nullable<Text>,
        enrichment_status -> Text,
        enrichment_error -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
        meta_description -> Nullable<Text>,
        meta_category -> Nullable<Text>,
        meta_document_type -> Nullable<Text>,
        meta_tags -> Nullable<Text>,
        meta_department -> Nullable<Text>,
        meta_expiration_date -> Nullable<Text>,
        meta_revision -> Nullable<BigInt>,
        meta_created_at -> Nullable<Text>,
        meta_updated_at -> Nullable<Text>,
    }
}

diesel::table! {
    metadata (id) {
        id -> Text,
        description -> Nullable<Text>,
        category -> Nullable<Text>,
        document_type -> Nullable<Text>,
        tags -> Text,
        department -> Nullable<Text>,
        expiration_date -> Nullable<Text>,
        revision -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    audit_log (id) {
        id -> Text,
        timestamp -> Text,
        actor_id -> Text,
        actor_role -> Text,
        action -> Text,
        document_id -> Nullable<Text>,
        description -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(audit_log, documents, metadata,);
