//! SQL schema definitions.

/// Complete schema for the v1 client database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Registration (exactly one row once registered)
-- ============================================================

CREATE TABLE IF NOT EXISTS registration (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT NOT NULL,
    invitation_public_key BLOB NOT NULL,
    invitation_private_key BLOB NOT NULL,
    kx_public_key BLOB NOT NULL,
    kx_private_key BLOB NOT NULL,
    allocation INTEGER NOT NULL,
    authentication_token TEXT NOT NULL,
    public_id TEXT NOT NULL,
    registered_at INTEGER NOT NULL
);

-- ============================================================
-- Friends & transmission state
-- ============================================================

-- progress: 0 = outgoing async invitation pending, 1 = complete
CREATE TABLE IF NOT EXISTS friend (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    unique_name TEXT NOT NULL,
    public_id TEXT NOT NULL,
    kx_public_key BLOB NOT NULL,
    progress INTEGER NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    completed_at INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_friend_unique_name
    ON friend(unique_name) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS transmission (
    friend_uid INTEGER PRIMARY KEY REFERENCES friend(uid),
    read_index INTEGER NOT NULL,
    read_key BLOB NOT NULL,
    write_key BLOB NOT NULL,
    ack_index INTEGER NOT NULL,
    sent_acked_seqnum INTEGER NOT NULL DEFAULT 0,
    received_seqnum INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Invitations
-- ============================================================

CREATE TABLE IF NOT EXISTS outgoing_async_invitation (
    friend_uid INTEGER PRIMARY KEY REFERENCES friend(uid),
    public_id TEXT NOT NULL UNIQUE,
    invitation_public_key BLOB NOT NULL,
    message TEXT NOT NULL,
    sent_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS incoming_invitation (
    public_id TEXT PRIMARY KEY,
    message TEXT NOT NULL,
    received_at INTEGER NOT NULL
);

-- ============================================================
-- Messages
-- ============================================================

CREATE TABLE IF NOT EXISTS sent_message (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    sent_at INTEGER NOT NULL,
    delivered INTEGER NOT NULL DEFAULT 0,
    delivered_at INTEGER
);

CREATE TABLE IF NOT EXISTS sent_message_friend (
    sent_message_uid INTEGER NOT NULL REFERENCES sent_message(uid),
    to_friend INTEGER NOT NULL REFERENCES friend(uid),
    num_chunks INTEGER NOT NULL,
    delivered INTEGER NOT NULL DEFAULT 0,
    delivered_at INTEGER,
    PRIMARY KEY (sent_message_uid, to_friend)
);

CREATE TABLE IF NOT EXISTS received_message (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    from_friend INTEGER NOT NULL REFERENCES friend(uid),
    content TEXT NOT NULL,
    other_recipients TEXT NOT NULL DEFAULT '[]',
    received_at INTEGER NOT NULL,
    seen INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Outbox & reassembly buffer
-- ============================================================

-- system: 1 for the OutgoingInvitation control chunk, whose content is the
-- sender's public id
CREATE TABLE IF NOT EXISTS outgoing_chunk (
    to_friend INTEGER NOT NULL REFERENCES friend(uid),
    sequence_number INTEGER NOT NULL,
    chunks_start_sequence_number INTEGER NOT NULL,
    num_chunks INTEGER NOT NULL,
    message_uid INTEGER REFERENCES sent_message(uid),
    content BLOB NOT NULL,
    system INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (to_friend, sequence_number)
);

CREATE TABLE IF NOT EXISTS incoming_chunk (
    from_friend INTEGER NOT NULL REFERENCES friend(uid),
    sequence_number INTEGER NOT NULL,
    chunks_start_sequence_number INTEGER NOT NULL,
    num_chunks INTEGER NOT NULL,
    content BLOB NOT NULL,
    PRIMARY KEY (from_friend, sequence_number)
);

CREATE INDEX IF NOT EXISTS idx_incoming_chunk_message
    ON incoming_chunk(from_friend, chunks_start_sequence_number);
"#;
