// Hand-maintained diesel schema; keep in sync with migrations/.

diesel::table! {
    users (id) {
        id -> Int8,
        #[max_length = 100]
        username -> Varchar,
        #[max_length = 100]
        email -> Varchar,
        #[max_length = 100]
        display_name -> Nullable<Varchar>,
        avatar -> Nullable<Text>,
        bio -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    servers (id) {
        id -> Int8,
        #[max_length = 100]
        name -> Varchar,
        description -> Nullable<Text>,
        icon -> Nullable<Text>,
        owner_id -> Int8,
        is_public -> Bool,
        #[max_length = 20]
        invite_code -> Nullable<Varchar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    server_members (id) {
        id -> Int8,
        server_id -> Int8,
        user_id -> Int8,
        #[max_length = 100]
        nickname -> Nullable<Varchar>,
        #[max_length = 20]
        role -> Varchar,
        joined_at -> Timestamp,
    }
}

diesel::table! {
    server_roles (id) {
        id -> Int8,
        server_id -> Int8,
        #[max_length = 100]
        name -> Varchar,
        #[max_length = 7]
        color -> Varchar,
        position -> Int4,
        is_default -> Bool,
        manage_channels -> Bool,
        manage_server -> Bool,
        manage_roles -> Bool,
        manage_messages -> Bool,
        kick_members -> Bool,
        ban_members -> Bool,
        create_invites -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    member_roles (member_id, role_id) {
        member_id -> Int8,
        role_id -> Int8,
    }
}

diesel::table! {
    server_invites (id) {
        id -> Int8,
        server_id -> Int8,
        #[max_length = 20]
        code -> Varchar,
        created_by -> Int8,
        max_uses -> Int4,
        uses -> Int4,
        expires_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    channels (id) {
        id -> Int8,
        server_id -> Int8,
        #[max_length = 100]
        name -> Varchar,
        #[max_length = 60]
        channel_type -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    dm_channels (id) {
        id -> Int8,
        user_a -> Int8,
        user_b -> Int8,
        created_at -> Timestamp,
        last_message_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    messages (id) {
        id -> Int8,
        channel_id -> Nullable<Int8>,
        dm_channel_id -> Nullable<Int8>,
        author_id -> Int8,
        content -> Text,
        is_edited -> Bool,
        edited_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    message_reactions (id) {
        id -> Int8,
        message_id -> Int8,
        user_id -> Int8,
        #[max_length = 32]
        emoji -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    friend_requests (id) {
        id -> Int8,
        sender_id -> Int8,
        receiver_id -> Int8,
        #[max_length = 20]
        status -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    friends (id) {
        id -> Int8,
        user_id -> Int8,
        friend_id -> Int8,
        created_at -> Timestamp,
    }
}

diesel::table! {
    blocked_users (id) {
        id -> Int8,
        blocker_id -> Int8,
        blocked_id -> Int8,
        created_at -> Timestamp,
    }
}

diesel::table! {
    notifications (id) {
        id -> Int8,
        user_id -> Int8,
        #[max_length = 20]
        notification_type -> Varchar,
        #[max_length = 100]
        title -> Varchar,
        content -> Text,
        friend_request_id -> Nullable<Int8>,
        message_id -> Nullable<Int8>,
        server_id -> Nullable<Int8>,
        channel_id -> Nullable<Int8>,
        is_read -> Bool,
        created_at -> Timestamp,
    }
}

diesel::joinable!(servers -> users (owner_id));
diesel::joinable!(server_members -> servers (server_id));
diesel::joinable!(server_members -> users (user_id));
diesel::joinable!(server_roles -> servers (server_id));
diesel::joinable!(member_roles -> server_members (member_id));
diesel::joinable!(member_roles -> server_roles (role_id));
diesel::joinable!(server_invites -> servers (server_id));
diesel::joinable!(server_invites -> users (created_by));
diesel::joinable!(channels -> servers (server_id));
diesel::joinable!(messages -> channels (channel_id));
diesel::joinable!(messages -> dm_channels (dm_channel_id));
diesel::joinable!(messages -> users (author_id));
diesel::joinable!(message_reactions -> messages (message_id));
diesel::joinable!(message_reactions -> users (user_id));
diesel::joinable!(notifications -> users (user_id));
diesel::joinable!(notifications -> friend_requests (friend_request_id));
diesel::joinable!(notifications -> messages (message_id));
diesel::joinable!(notifications -> servers (server_id));
diesel::joinable!(notifications -> channels (channel_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    servers,
    server_members,
    server_roles,
    member_roles,
    server_invites,
    channels,
    dm_channels,
    messages,
    message_reactions,
    friend_requests,
    friends,
    blocked_users,
    notifications,
);
