//! Integration test: homomorphic PIR across several encoded blocks.
//!
//! Rows are packed `SLOT_COUNT` to a block, and each block is split into two
//! halves of `ROW_SIZE` that the server merges with a row swap. This test
//! places rows in every half of three blocks and reads each back privately,
//! including through the message server's wire layer.

use murmur_pir::params::{ROW_SIZE, SLOT_COUNT};
use murmur_pir::{FastPir, FastPirClient, Pir, PirClient, PirScheme};
use murmur_types::{PirIndex, PirValue, MESSAGE_SIZE};

fn row(seed: u32) -> PirValue {
    let mut r = [0u8; MESSAGE_SIZE];
    for (i, b) in r.iter_mut().enumerate() {
        *b = (i as u32).wrapping_mul(31).wrapping_add(seed * 7) as u8;
    }
    r
}

#[test]
#[ignore]
fn private_reads_across_blocks() {
    let targets: Vec<PirIndex> = [
        0,
        ROW_SIZE - 1,
        ROW_SIZE,
        SLOT_COUNT + 3,
        SLOT_COUNT + ROW_SIZE + 11,
        2 * SLOT_COUNT + 100,
    ]
    .into_iter()
    .map(|i| i as PirIndex)
    .collect();

    let mut server = FastPir::new().expect("server");
    let max = *targets.iter().max().expect("targets");
    server.allocate_to_max(max).expect("allocate");
    assert_eq!(server.db_rows(), max as usize + 1);
    for &index in &targets {
        server.set_value(index, &row(index)).expect("set");
    }

    let mut client = FastPirClient::new().expect("client");
    for &index in &targets {
        let query = client.query(index, server.db_rows()).expect("query");
        let answer = server.get_value_privately(&query).expect("answer");
        assert_eq!(
            client.decode(&answer, index).expect("decode"),
            row(index),
            "row {index} must decode exactly"
        );
    }

    // An untouched row reads back as zeros.
    let query = client.query(1, server.db_rows()).expect("query");
    let answer = server.get_value_privately(&query).expect("answer");
    assert_eq!(client.decode(&answer, 1).expect("decode"), [0u8; MESSAGE_SIZE]);
}

#[test]
#[ignore]
fn query_shaped_for_larger_database() {
    // The client shapes queries for a fixed size; the server skips blocks it
    // does not have.
    let mut server = PirScheme::Homomorphic.new_server().expect("server");
    server.allocate_to_max(9).expect("allocate");
    server.set_value(9, &row(9)).expect("set");

    let mut client = PirScheme::Homomorphic.new_client().expect("client");
    let query = client.query(9, 4 * SLOT_COUNT).expect("query");
    let answer = server.get_value_privately(&query).expect("answer");
    assert_eq!(client.decode(&answer, 9).expect("decode"), row(9));
}
