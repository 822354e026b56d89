// Mirrors the tables owned by the plugin's migrations.

diesel::table! {
    calendar_events (id) {
        id -> Text,
        title -> Text,
        description -> Nullable<Text>,
        dt_start -> Timestamptz,
        dt_end -> Timestamptz,
        created -> Nullable<Timestamptz>,
        owner -> Text,
        channel -> Nullable<Text>,
        team -> Nullable<Text>,
        recurrent -> Bool,
        recurrence -> Nullable<Text>,
        color -> Nullable<Text>,
        alert -> Nullable<Text>,
        alert_time -> Nullable<Timestamptz>,
        processed -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    calendar_members (event, member) {
        event -> Text,
        member -> Text,
    }
}

diesel::joinable!(calendar_members -> calendar_events (event));

diesel::allow_tables_to_appear_in_same_query!(calendar_events, calendar_members);
