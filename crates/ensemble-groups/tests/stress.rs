//! Stress tests for ensemble-groups
//!
//! Random edit sequences interleaved with member-list refreshes and
//! publishes, checking that the pending edits, the projection and the
//! compiled diff stay consistent with each other after every step.

use std::collections::BTreeSet;
use std::time::Instant;

use ensemble_core::{GroupType, Identity, MemberOrPending, PermissionSet, RemoteDeleteSetting};
use ensemble_groups::{
    EditSession, MemberStore, PublishOutcome, SessionState, compile_diff, resolve_permissions,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const IDENTITY_POOL: u8 = 12;

fn id(b: u8) -> Identity {
    Identity::new(vec![b])
}

fn owner() -> Identity {
    id(0xee)
}

fn random_group_type(rng: &mut StdRng) -> GroupType {
    match rng.random_range(0..4) {
        0 => GroupType::Simple,
        1 => GroupType::Private,
        2 => GroupType::ReadOnly,
        _ => GroupType::Custom {
            read_only: rng.random_bool(0.5),
            remote_delete: match rng.random_range(0..3) {
                0 => RemoteDeleteSetting::Nobody,
                1 => RemoteDeleteSetting::Admins,
                _ => RemoteDeleteSetting::Everyone,
            },
        },
    }
}

fn random_snapshot(rng: &mut StdRng) -> Vec<MemberOrPending> {
    let mut members = vec![MemberOrPending::member(
        owner(),
        vec![rng.random::<u8>()],
        PermissionSet::DEFAULT_ADMIN,
    )];
    for b in 0..IDENTITY_POOL {
        if !rng.random_bool(0.6) {
            continue;
        }
        let permissions = match rng.random_range(0..3) {
            0 => PermissionSet::DEFAULT_ADMIN,
            1 => PermissionSet::DEFAULT_MEMBER,
            _ => PermissionSet::EMPTY,
        };
        let key_len = rng.random_range(0..3);
        let sort_key: Vec<u8> = (0..key_len).map(|_| rng.random()).collect();
        members.push(MemberOrPending::member(id(b), sort_key, permissions));
    }
    members
}

fn check_invariants(session: &EditSession, store: &MemberStore) {
    let changes = session.changes();
    let group_type = session.group_type();

    for identity in changes.members_added().keys() {
        assert!(!store.contains(identity), "added member already stored");
        assert!(!changes.members_removed().contains(identity));
    }
    for identity in changes.members_removed() {
        assert!(store.contains(identity), "removal of unknown member");
        assert!(!changes.admin_changes().contains_key(identity));
    }
    for identity in changes.admin_changes().keys() {
        assert!(store.contains(identity), "admin change of unknown member");
    }

    // Synthesized records agree with what the diff will send
    for added in changes.members_added().values() {
        assert!(added.pending);
        assert_eq!(
            added.permissions,
            resolve_permissions(&group_type, added.is_admin())
        );
    }

    let displayed = session.displayed_members(store);
    for pair in displayed.windows(2) {
        assert!(pair[0].sort_key <= pair[1].sort_key, "projection not sorted");
    }
    let unique: BTreeSet<&Identity> = displayed.iter().map(|m| &m.identity).collect();
    assert_eq!(unique.len(), displayed.len(), "duplicate identity displayed");

    let diff = compile_diff(
        changes,
        store,
        &group_type,
        &session.initial_group_type(),
        &owner(),
    )
    .unwrap();
    for (identity, permissions) in &diff.added_members_with_permissions {
        assert_eq!(&changes.members_added()[identity].permissions, permissions);
    }
    assert_eq!(&diff.removed_members, changes.members_removed());
    if diff.is_empty() {
        assert!(!diff.permission_changes.contains_key(&owner()));
    } else {
        assert_eq!(
            diff.permission_changes[&owner()],
            resolve_permissions(&group_type, true)
        );
    }
}

fn run_random_session(seed: u64, steps: usize) -> (usize, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = MemberStore::new();
    store.refresh(random_snapshot(&mut rng));

    let mut session = EditSession::new(owner(), GroupType::infer(store.members()));
    session.start_editing();

    let mut published = 0;
    let mut failed = 0;

    for _ in 0..steps {
        let target = id(rng.random_range(0..IDENTITY_POOL));
        match rng.random_range(0..10) {
            0..=2 => {
                session.member_added(&store, target.clone(), vec![rng.random::<u8>()]);
            }
            3 | 4 => {
                session.member_removed(&store, &target);
            }
            5 | 6 => {
                let is_admin = rng.random_bool(0.5);
                session.permission_changed(&store, &target, is_admin);
            }
            7 => {
                let group_type = random_group_type(&mut rng);
                session.group_type_changed(group_type);
            }
            8 => {
                store.refresh(random_snapshot(&mut rng));
                session.reconcile(&store);
            }
            _ => match session.publish(&store).unwrap() {
                PublishOutcome::Submit(diff) => {
                    assert!(!diff.is_empty());
                    assert_eq!(session.state(), SessionState::Publishing);
                    if rng.random_bool(0.3) {
                        let before = session.changes().clone();
                        session.publication_failed();
                        assert_eq!(session.changes(), &before);
                        failed += 1;
                    } else {
                        session.publication_finished();
                        published += 1;
                    }
                }
                PublishOutcome::NothingToPublish => {
                    assert!(session.changes().is_empty());
                }
                PublishOutcome::Ignored => unreachable!("publish outside edit mode"),
            },
        }

        if session.state() == SessionState::Idle {
            session.start_editing();
        }
        check_invariants(&session, &store);
    }

    (published, failed)
}

#[test]
fn test_random_edit_sequences() {
    println!("\n=== Testing Random Edit Sequences ===");
    let start = Instant::now();

    const SEEDS: u64 = 64;
    const STEPS: usize = 500;

    let mut published = 0;
    let mut failed = 0;
    for seed in 0..SEEDS {
        let (p, f) = run_random_session(seed, STEPS);
        published += p;
        failed += f;
    }

    println!(
        "{} sessions x {} steps: {} published, {} failed in {:?}",
        SEEDS,
        STEPS,
        published,
        failed,
        start.elapsed()
    );
    assert!(published > 0);
}

#[test]
fn test_large_group_projection() {
    println!("\n=== Testing Large Group Projection ===");
    let start = Instant::now();

    const MEMBER_COUNT: u32 = 5_000;
    let mut rng = StdRng::seed_from_u64(7);

    let members: Vec<MemberOrPending> = (0..MEMBER_COUNT)
        .map(|i| {
            let sort_key: Vec<u8> = (0..4).map(|_| rng.random()).collect();
            MemberOrPending::member(
                Identity::new(i.to_be_bytes().to_vec()),
                sort_key,
                PermissionSet::DEFAULT_MEMBER,
            )
        })
        .collect();
    let store = MemberStore::with_members(members);

    let mut session = EditSession::new(owner(), GroupType::Private);
    session.start_editing();
    for i in (0..MEMBER_COUNT).step_by(10) {
        session.member_removed(&store, &Identity::new(i.to_be_bytes().to_vec()));
    }
    for i in MEMBER_COUNT..MEMBER_COUNT + 100 {
        session.member_added(&store, Identity::new(i.to_be_bytes().to_vec()), vec![0xff]);
    }

    let displayed = session.displayed_members(&store);
    assert_eq!(displayed.len(), (MEMBER_COUNT - MEMBER_COUNT / 10 + 100) as usize);
    for pair in displayed.windows(2) {
        assert!(pair[0].sort_key <= pair[1].sort_key);
    }

    let diff = compile_diff(
        session.changes(),
        &store,
        &session.group_type(),
        &session.initial_group_type(),
        &owner(),
    )
    .unwrap();
    assert_eq!(diff.removed_members.len(), (MEMBER_COUNT / 10) as usize);
    assert_eq!(diff.added_members_with_permissions.len(), 100);
    // Everyone already holds member permissions; only the owner is asserted
    assert_eq!(diff.permission_changes.len(), 1);

    println!("Projected {} members in {:?}", displayed.len(), start.elapsed());
}
