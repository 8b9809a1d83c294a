//! User-facing operations.
//!
//! These only touch the local store (plus one server call for
//! registration). Everything they queue goes out through the round loop.

use std::time::Duration;

use anyhow::{bail, Context};
use tracing::info;

use murmur_crypto::x25519::{
    generate_invitation_keypair, generate_kx_keypair, X25519PublicKey, X25519StaticSecret,
};
use murmur_crypto::{derive_read_write_keys, PublicId};
use murmur_db::{Friend, NewFriend, NewOutgoingInvitation, ReceivedMessage, Registration};
use murmur_types::wire::RegisterRequest;
use murmur_types::{GUARANTEED_SINGLE_MESSAGE_SIZE, INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE};

use crate::connection::ServerConnection;
use crate::context::DaemonContext;

/// Register with the server and persist our keys.
pub async fn register<C: ServerConnection>(
    ctx: &DaemonContext,
    conn: &C,
    name: &str,
    admission_key: &str,
) -> anyhow::Result<String> {
    if ctx.store.has_registered()? {
        bail!("already registered");
    }
    let (invitation_sk, invitation_pk) = generate_invitation_keypair();
    let (kx_sk, kx_pk) = generate_kx_keypair();

    let response = conn
        .register(RegisterRequest {
            invitation_public_key: invitation_pk.to_bytes().to_vec(),
            beta_key: admission_key.to_owned(),
        })
        .await
        .context("registration rejected")?;

    let public_id = PublicId {
        index: response.allocation,
        kx_public_key: kx_pk,
        invitation_public_key: invitation_pk,
    }
    .to_string();
    ctx.store.register(&Registration {
        name: name.to_owned(),
        invitation_public_key: invitation_pk.to_bytes(),
        invitation_private_key: invitation_sk.to_bytes(),
        kx_public_key: kx_pk.to_bytes(),
        kx_private_key: kx_sk.to_bytes(),
        allocation: response.allocation,
        authentication_token: response.authentication_token,
        public_id: public_id.clone(),
    })?;
    info!(allocation = response.allocation, "registered");
    Ok(public_id)
}

pub fn my_public_id(ctx: &DaemonContext) -> anyhow::Result<String> {
    Ok(ctx.store.registration()?.public_id)
}

/// Session keys and addressing for a friend identified by `public_id`.
fn new_friend(
    ctx: &DaemonContext,
    unique_name: &str,
    public_id: &str,
) -> anyhow::Result<(NewFriend, PublicId)> {
    if unique_name.trim().is_empty() {
        bail!("friend name must not be empty");
    }
    let id: PublicId = public_id.parse().context("malformed public id")?;
    let reg = ctx.store.registration()?;
    if id.to_string() == reg.public_id {
        bail!("cannot add yourself");
    }
    let keys = derive_read_write_keys(
        &X25519PublicKey::from_bytes(reg.kx_public_key),
        &X25519StaticSecret::from_bytes(reg.kx_private_key),
        &id.kx_public_key,
    )?;
    let friend = NewFriend {
        unique_name: unique_name.to_owned(),
        public_id: id.to_string(),
        kx_public_key: id.kx_public_key.to_bytes(),
        read_index: id.index,
        read_key: keys.read_key,
        write_key: keys.write_key,
    };
    Ok((friend, id))
}

/// Invite someone by public id. They become a friend once they accept.
pub fn add_async_friend(
    ctx: &DaemonContext,
    unique_name: &str,
    public_id: &str,
    message: &str,
) -> anyhow::Result<Friend> {
    if message.len() > INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE {
        bail!(
            "invitation message is {} bytes, limit is {INVITATION_MESSAGE_MAX_PLAINTEXT_SIZE}",
            message.len()
        );
    }
    let (friend, id) = new_friend(ctx, unique_name, public_id)?;
    let friend = ctx
        .store
        .add_outgoing_async_invitation(&NewOutgoingInvitation {
            friend,
            invitation_public_key: id.invitation_public_key.to_bytes(),
            message: message.to_owned(),
        })?;
    info!(friend_uid = friend.uid, "queued async invitation");
    Ok(friend)
}

pub fn accept_invitation(
    ctx: &DaemonContext,
    public_id: &str,
    unique_name: &str,
) -> anyhow::Result<Friend> {
    let (friend, _) = new_friend(ctx, unique_name, public_id)?;
    let friend = ctx.store.accept_incoming_invitation(&friend)?;
    info!(friend_uid = friend.uid, "accepted invitation");
    Ok(friend)
}

pub fn deny_invitation(ctx: &DaemonContext, public_id: &str) -> anyhow::Result<()> {
    let id: PublicId = public_id.parse().context("malformed public id")?;
    ctx.store.deny_incoming_invitation(&id.to_string())?;
    Ok(())
}

/// Withdraw a pending outgoing invitation and forget the friend.
pub fn cancel_async_invitation(ctx: &DaemonContext, public_id: &str) -> anyhow::Result<()> {
    let id: PublicId = public_id.parse().context("malformed public id")?;
    ctx.store.remove_outgoing_async_invitation(&id.to_string())?;
    Ok(())
}

/// Queue a message to one or more friends. Returns the sent message id.
pub fn send_message(ctx: &DaemonContext, to: &[String], text: &str) -> anyhow::Result<i64> {
    if to.is_empty() {
        bail!("no recipients");
    }
    let uid = ctx
        .store
        .queue_message_to_send(to, text, GUARANTEED_SINGLE_MESSAGE_SIZE)?;
    info!(message_uid = uid, recipients = to.len(), "queued message");
    Ok(uid)
}

/// Unseen messages, waiting up to `timeout` for one to arrive.
pub async fn wait_for_new_messages(
    ctx: &DaemonContext,
    timeout: Duration,
) -> anyhow::Result<Vec<ReceivedMessage>> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        // Register interest before checking, so a signal in between is kept.
        let notified = ctx.new_messages.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let unseen = ctx.store.received_messages(true)?;
        if !unseen.is_empty() {
            return Ok(unseen);
        }
        if tokio::time::timeout_at(deadline, notified).await.is_err() {
            return Ok(Vec::new());
        }
    }
}
