//! Integration test: async invitations through the server.
//!
//! Exercises the invitation state machine end to end:
//! 1. Alice invites Bob by public id; Bob is a pending friend at Alice
//! 2. Bob's crawler finds the invitation on the board
//! 3. Bob accepts; Alice is a complete friend at Bob
//! 4. Bob receives Alice's invitation echo and acks it
//! 5. Alice sees the ack and completes Bob
//!
//! Uses the non-private PIR engine so many rounds run quickly.

use murmur_daemon::commands;
use murmur_db::InvitationProgress;
use murmur_integration_tests::{befriend, round_all, rounds_until, server, Node};
use murmur_pir::PirScheme;

const SCHEME: PirScheme = PirScheme::NonPrivate;

#[tokio::test]
async fn invitation_accept_completes_both_sides() {
    let server = server(SCHEME).expect("server");
    let mut alice = Node::register(&server, SCHEME, "alice").await.expect("alice");
    let mut bob = Node::register(&server, SCHEME, "bob").await.expect("bob");

    // =========================================================
    // Step 1: Alice invites Bob
    // =========================================================
    commands::add_async_friend(&alice.ctx, "bob", &bob.public_id, "it's alice")
        .expect("invite");
    assert_eq!(
        alice.progress_of("bob").expect("bob"),
        InvitationProgress::OutgoingAsync
    );

    // =========================================================
    // Step 2: Bob finds it
    // =========================================================
    round_all(&mut [&mut alice, &mut bob]).await.expect("round");
    let incoming = bob.ctx.store.incoming_invitations().expect("incoming");
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].public_id, alice.public_id);
    assert_eq!(incoming[0].message, "it's alice");

    // Seeing it again on the next crawl does not duplicate it.
    round_all(&mut [&mut alice, &mut bob]).await.expect("round");
    assert_eq!(bob.ctx.store.incoming_invitations().expect("incoming").len(), 1);

    // =========================================================
    // Step 3: Bob accepts
    // =========================================================
    commands::accept_invitation(&bob.ctx, &alice.public_id, "alice").expect("accept");
    assert_eq!(
        bob.progress_of("alice").expect("alice"),
        InvitationProgress::Complete
    );

    // =========================================================
    // Step 4-5: Echo, ack, completion
    // =========================================================
    rounds_until(&mut [&mut alice, &mut bob], 20, |nodes| {
        Ok(nodes[0].progress_of("bob")? == InvitationProgress::Complete)
    })
    .await
    .expect("alice completes bob");

    assert!(alice
        .ctx
        .store
        .outgoing_async_invitations()
        .expect("outgoing")
        .is_empty());

    // Later crawls never bring back an invitation from a complete friend.
    round_all(&mut [&mut alice, &mut bob]).await.expect("round");
    assert!(bob
        .ctx
        .store
        .incoming_invitations()
        .expect("incoming")
        .is_empty());
}

#[tokio::test]
async fn crossed_invitations_complete_without_accept() {
    let server = server(SCHEME).expect("server");
    let mut alice = Node::register(&server, SCHEME, "alice").await.expect("alice");
    let mut bob = Node::register(&server, SCHEME, "bob").await.expect("bob");

    commands::add_async_friend(&alice.ctx, "bob", &bob.public_id, "hi bob").expect("invite");
    commands::add_async_friend(&bob.ctx, "alice", &alice.public_id, "hi alice")
        .expect("invite");

    rounds_until(&mut [&mut alice, &mut bob], 10, |nodes| {
        Ok(nodes[0].progress_of("bob")? == InvitationProgress::Complete
            && nodes[1].progress_of("alice")? == InvitationProgress::Complete)
    })
    .await
    .expect("both complete");

    // Bob crawled first, so Alice's invitation text became a message at Bob.
    // Bob's own invitation was withdrawn before it was ever posted; Alice
    // completed him through his invitation echo instead.
    let at_bob = bob.ctx.store.received_messages(false).expect("messages");
    assert!(at_bob.iter().any(|m| m.content == "hi bob"));
    assert!(bob.ctx.store.incoming_invitations().expect("incoming").is_empty());
    assert!(alice.ctx.store.incoming_invitations().expect("incoming").is_empty());
}

#[tokio::test]
async fn denied_invitation_leaves_inviter_pending() {
    let server = server(SCHEME).expect("server");
    let mut alice = Node::register(&server, SCHEME, "alice").await.expect("alice");
    let mut bob = Node::register(&server, SCHEME, "bob").await.expect("bob");

    commands::add_async_friend(&alice.ctx, "bob", &bob.public_id, "hello").expect("invite");
    round_all(&mut [&mut alice, &mut bob]).await.expect("round");
    commands::deny_invitation(&bob.ctx, &alice.public_id).expect("deny");
    assert!(bob.ctx.store.incoming_invitations().expect("incoming").is_empty());

    for _ in 0..3 {
        round_all(&mut [&mut alice, &mut bob]).await.expect("round");
    }
    assert_eq!(
        alice.progress_of("bob").expect("bob"),
        InvitationProgress::OutgoingAsync
    );

    // Cancelling forgets Bob and stops the invitation.
    commands::cancel_async_invitation(&alice.ctx, &bob.public_id).expect("cancel");
    assert!(alice.ctx.store.friend("bob").is_err());
    assert!(alice
        .ctx
        .store
        .outgoing_async_invitations()
        .expect("outgoing")
        .is_empty());
}

#[tokio::test]
async fn befriend_helper_links_three_nodes() {
    let server = server(SCHEME).expect("server");
    let mut alice = Node::register(&server, SCHEME, "alice").await.expect("alice");
    let mut bob = Node::register(&server, SCHEME, "bob").await.expect("bob");
    let mut carol = Node::register(&server, SCHEME, "carol").await.expect("carol");

    befriend(&mut alice, &mut bob).await.expect("alice-bob");
    befriend(&mut alice, &mut carol).await.expect("alice-carol");

    let names: Vec<String> = alice
        .ctx
        .store
        .friends()
        .expect("friends")
        .into_iter()
        .map(|f| f.unique_name)
        .collect();
    assert!(names.contains(&"bob".to_owned()));
    assert!(names.contains(&"carol".to_owned()));
    assert_eq!(
        carol.progress_of("alice").expect("alice"),
        InvitationProgress::Complete
    );
}
