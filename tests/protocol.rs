// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client and server sessions over loopback TCP.

#![allow(clippy::unwrap_used)]

use std::net::{TcpListener, TcpStream};
use std::thread;

use phebloom::wire::WireStats;
use phebloom::{
    BitArray, Ciphertext, Client, ConnectOptions, Error, PackingLayout, Paillier, Peer, ProtocolConfig, Report, Server,
    ServerState,
};

struct ServerSide {
    columns: usize,
    packs: usize,
    stored: Vec<Vec<Ciphertext>>,
    stats: WireStats,
}

fn bits(rows: &[&str]) -> Vec<BitArray> {
    rows.iter().map(|r| r.parse().unwrap()).collect()
}

fn config() -> phebloom::ProtocolConfigBuilder {
    ProtocolConfig::builder()
        .key_bits(512)
        .num_slices(1)
        .max_query_elements(2)
        .field_width(4)
        .threads(2)
}

/// Runs a full session; `drive` issues the queries the server expects.
fn run_session<T>(
    rows: Vec<BitArray>,
    config: ProtocolConfig,
    server_queries: usize,
    drive: impl FnOnce(&mut Client<TcpStream>) -> T,
) -> (T, Report, WireStats, ServerSide) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server_config = config.clone();
    let server = thread::spawn(move || {
        let peer = Peer::accept(&listener).unwrap();
        let mut server = Server::accept_key(peer, server_config).unwrap();
        server.receive_database().unwrap();
        assert_eq!(server.state(), ServerState::Ready);

        server.run(server_queries).unwrap();
        server.finish().unwrap();
        assert_eq!(server.state(), ServerState::Done);

        ServerSide {
            columns: server.database().num_columns(),
            packs: server.database().packs(),
            stored: server.database().columns().to_vec(),
            stats: *server.stats(),
        }
    });

    let peer = Peer::connect(addr, ConnectOptions::default()).unwrap();
    let mut client = Client::new(peer, config);
    client.setup(rows).unwrap();

    let out = drive(&mut client);
    let report = client.finish().unwrap().clone();
    let stats = *client.stats();

    (out, report, stats, server.join().unwrap())
}

fn scenario_rows() -> Vec<BitArray> {
    bits(&["11010000", "10010100", "00011010"])
}

#[test]
fn matches_three_rows() {
    let query: BitArray = "10010000".parse().unwrap();
    let config = config().build().unwrap();

    let (counts, report, _, server) = run_session(scenario_rows(), config, 1, |client| client.query(&query).unwrap());

    assert_eq!(counts, vec![2, 2, 1]);
    assert_eq!(server.columns, 8);
    assert_eq!(server.packs, 1);

    for key in ["c_db_encrypt", "c_db_upload", "c_qry_upload_0", "s_execute_0", "c_qry_download_0", "c_qry_decrypt_0"] {
        assert!(report.get(key).is_some(), "missing {key}");
    }
    assert!(report.get("c_qry_download_0").unwrap().bytes > 0);
}

#[test]
fn empty_selection_decrypts_to_zeros() {
    let config = config().build().unwrap();
    let empty = BitArray::zeros(8);

    let (results, _, _, _) = run_session(scenario_rows(), config, 2, |client| {
        (client.query(&empty).unwrap(), client.query(&empty).unwrap())
    });

    assert_eq!(results.0, vec![0, 0, 0]);
    assert_eq!(results.1, results.0);
}

/// Decrypts every stored column back into its per-row bits.
fn stored_plaintext(server: &ServerSide, paillier: &Paillier, layout: &PackingLayout, rows: usize) -> Vec<Vec<u64>> {
    server
        .stored
        .iter()
        .map(|column| paillier.decrypt_and_unpack_many(column, layout, rows).unwrap())
        .collect()
}

#[test]
fn chunking_does_not_change_results() {
    let query: BitArray = "01011001".parse().unwrap();

    let whole = config().build().unwrap();
    let chunked = config().chunk_size(3).build().unwrap();
    let session = |client: &mut Client<TcpStream>| {
        let counts = client.query(&query).unwrap();
        (counts, client.paillier().unwrap().clone(), *client.layout().unwrap())
    };

    let ((a, key_a, layout_a), _, _, server_a) = run_session(scenario_rows(), whole, 1, session);
    let ((b, key_b, layout_b), _, _, server_b) = run_session(scenario_rows(), chunked, 1, session);

    assert_eq!(a, b);
    assert_eq!(a, vec![2, 1, 2]);
    assert_eq!((server_a.columns, server_a.packs), (server_b.columns, server_b.packs));

    let matrix_a = stored_plaintext(&server_a, &key_a, &layout_a, 3);
    let matrix_b = stored_plaintext(&server_b, &key_b, &layout_b, 3);
    assert_eq!(matrix_a, matrix_b);

    let rows = scenario_rows();
    for (col, column) in matrix_a.iter().enumerate() {
        let expected: Vec<u64> = rows.iter().map(|row| u64::from(row.get(col))).collect();
        assert_eq!(column, &expected, "column {col}");
    }
}

#[test]
fn self_check_across_several_packs() {
    // 63-bit fields leave 8 slots per plaintext under a 512-bit key
    let rows: Vec<BitArray> = (0..20u32)
        .map(|i| (0..16).map(|bit| (i * 7 + bit * 3) % 5 < 2).collect())
        .collect();
    let query: BitArray = (0..16).map(|bit| bit % 3 == 0).collect();
    let expected: Vec<u64> = rows.iter().map(|row| row.and_count(&query)).collect();

    let config = config().field_width(63).self_check(true).chunk_size(5).build().unwrap();
    let (counts, _, _, server) = run_session(rows, config, 1, |client| client.query(&query).unwrap());

    assert_eq!(server.packs, 3);
    assert_eq!(counts, expected);
}

#[test]
fn duplicated_packs_repeat_first_rows() {
    let query: BitArray = "10010000".parse().unwrap();
    let config = config().duplication(3).build().unwrap();

    let (counts, _, _, server) = run_session(scenario_rows(), config, 1, |client| client.query(&query).unwrap());

    assert_eq!(server.packs, 3);
    assert_eq!(counts, vec![2, 2, 1, 2, 2, 1, 2, 2, 1]);
}

#[test]
fn invalid_queries_fail_before_sending() {
    let config = config().field_width(2).build().unwrap();

    let (errors, _, client_stats, server) = run_session(scenario_rows(), config, 0, |client| {
        let sent_before = client.stats().sent_messages;
        let overflow = client.query(&"11110000".parse().unwrap()).unwrap_err();
        let short = client.query(&BitArray::zeros(7)).unwrap_err();
        assert_eq!(client.stats().sent_messages, sent_before);
        (overflow, short)
    });

    assert!(matches!(errors.0, Error::PackingOverflow { field_width: 2, .. }));
    assert_eq!(errors.1, Error::QueryLengthMismatch { expected: 8, actual: 7 });

    // key, chunk count and one chunk
    assert_eq!(client_stats.sent_messages, 3);
    assert_eq!(client_stats.sent_bytes, server.stats.received_bytes);
}

#[test]
fn wire_counters_agree_and_skip_the_report() {
    let query: BitArray = "10010000".parse().unwrap();
    let config = config().chunk_size(4).build().unwrap();

    let (_, _, client, server) = run_session(scenario_rows(), config, 2, |client| {
        client.query(&query).unwrap();
        client.query(&query).unwrap();
    });

    assert_eq!(client.sent_messages, server.stats.received_messages);
    assert_eq!(client.sent_bytes, server.stats.received_bytes);
    // 1 key + 1 count + 2 chunks + 2 queries
    assert_eq!(client.sent_messages, 6);
    // the report arrives counted on the client, untracked on the server
    assert_eq!(client.received_messages, server.stats.sent_messages + 1);
}
