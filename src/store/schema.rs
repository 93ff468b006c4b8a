diesel::table! {
    documents (seq) {
        seq -> Integer,
        collection -> Text,
        doc_id -> Text,
        body -> Text,
    }
}
