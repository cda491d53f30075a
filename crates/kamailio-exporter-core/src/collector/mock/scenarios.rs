//! Pre-built Kamailio replies for testing.
//!
//! Shapes follow what a Kamailio 5.x `ctl` socket returns for each command.

use super::rpc::MockRpc;
use crate::record::{Record, StructItem};

fn st(items: &[(&str, Record)]) -> Record {
    Record::Struct(
        items
            .iter()
            .map(|(k, v)| StructItem::new(*k, v.clone()))
            .collect(),
    )
}

fn s(v: &str) -> Record {
    Record::String(v.to_string())
}

fn i(v: i64) -> Record {
    Record::Int(v)
}

fn stats_fetch_all() -> Record {
    st(&[
        ("core.bad_URIs_rcvd", s("0")),
        ("core.bad_msg_hdr", s("2")),
        ("core.drop_replies", s("0")),
        ("core.drop_requests", s("5")),
        ("core.err_replies", s("0")),
        ("core.err_requests", s("1")),
        ("core.fwd_replies", s("873")),
        ("core.fwd_requests", s("42")),
        ("core.rcv_replies", s("1020")),
        ("core.rcv_replies_18x", s("120")),
        ("core.rcv_replies_2xx", s("811")),
        ("core.rcv_requests", s("1200")),
        ("core.rcv_requests_ack", s("300")),
        ("core.rcv_requests_bye", s("290")),
        ("core.rcv_requests_invite", s("310")),
        ("core.rcv_requests_options", s("250")),
        ("core.unsupported_methods", s("0")),
        ("dialog.active_dialogs", s("14")),
        ("dialog.early_dialogs", s("2")),
        ("dialog.processed_dialogs", s("305")),
        ("dns.failed_dns_request", s("3")),
        ("shmem.fragments", s("117")),
        ("shmem.free_size", s("58834944")),
        ("shmem.max_used_size", s("9017344")),
        ("shmem.real_used_size", s("8274432")),
        ("shmem.total_size", s("67108864")),
        ("shmem.used_size", s("6920320")),
        ("sl.200_replies", s("250")),
        ("sl.sent_replies", s("260")),
        ("tcp.current_opened_connections", s("6")),
        ("tcp.current_write_queue_size", s("0")),
        ("tcp.established", s("118")),
        ("tmx.2xx_transactions", s("600")),
        ("tmx.UAS_transactions", s("640")),
        ("tmx.active_transactions", s("9")),
        ("tmx.rpl_sent", s("1500")),
        ("script.requests_total", s("17")),
        ("script.Queue_Depth", s("3")),
        ("script.lag_seconds", s("0.25")),
    ])
}

fn dispatcher_list() -> Record {
    let dest = |uri: &str, flags: &str, priority: i64, weight: i64, avg: f64| {
        st(&[
            ("URI", s(uri)),
            ("FLAGS", s(flags)),
            ("PRIORITY", i(priority)),
            (
                "ATTRS",
                st(&[
                    ("BODY", s(&format!("weight={}", weight))),
                    ("DUID", s("gw")),
                    ("MAXLOAD", i(0)),
                    ("WEIGHT", i(weight)),
                    ("RWEIGHT", i(0)),
                    ("SOCKET", s("udp:10.0.0.1:5060")),
                ]),
            ),
            (
                "LATENCY",
                st(&[
                    ("AVG", Record::Double(avg)),
                    ("STD", Record::Double(1.5)),
                    ("EST", Record::Double(avg)),
                    ("MAX", i(40)),
                    ("TIMEOUT", i(0)),
                ]),
            ),
        ])
    };

    st(&[
        ("NRSETS", i(2)),
        (
            "RECORDS",
            st(&[
                (
                    "SET",
                    st(&[
                        ("ID", i(1)),
                        (
                            "TARGETS",
                            st(&[
                                ("DEST", dest("sip:10.0.0.10:5060", "AP", 10, 50, 12.5)),
                                ("DEST", dest("sip:10.0.0.11:5060", "IP", 5, 50, 0.0)),
                            ]),
                        ),
                    ]),
                ),
                (
                    "SET",
                    st(&[
                        ("ID", i(2)),
                        (
                            "TARGETS",
                            st(&[("DEST", dest("sip:media.example.net:5080", "AP", 0, 100, 3.25))]),
                        ),
                    ]),
                ),
            ]),
        ),
    ])
}

impl MockRpc {
    /// Kamailio with the usual module set: tm, sl, tls, htable, dialog,
    /// dispatcher and rtpengine loaded. Dialog profiles `inbound` and
    /// `outbound` exist.
    pub fn typical_kamailio() -> Self {
        let mut rpc = Self::minimal_kamailio();

        rpc.add_reply(
            "tls.info",
            &[],
            vec![st(&[
                ("max_connections", i(2048)),
                ("opened_connections", i(4)),
                ("clear_text_write_queued_bytes", i(0)),
            ])],
        );

        rpc.add_reply(
            "rtpengine.show",
            &["all"],
            vec![
                st(&[
                    ("url", s("udp:127.0.0.1:2223")),
                    ("set", i(0)),
                    ("index", i(0)),
                    ("weight", i(1)),
                    ("disabled", i(0)),
                    ("recheck_ticks", i(0)),
                ]),
                st(&[
                    ("url", s("udp:10.0.0.20:2223")),
                    ("set", i(0)),
                    ("index", i(1)),
                    ("weight", i(1)),
                    ("disabled", i(1)),
                    ("recheck_ticks", i(60)),
                ]),
            ],
        );

        rpc.add_reply(
            "htable.listTables",
            &[],
            vec![
                st(&[
                    ("name", s("ipban")),
                    ("dbtable", s("")),
                    ("dbmode", i(0)),
                    ("expire", i(300)),
                    ("updateexpire", i(1)),
                    ("size", i(256)),
                    ("dmqreplicate", i(0)),
                ]),
                st(&[
                    ("name", s("routes")),
                    ("dbtable", s("htable_routes")),
                    ("dbmode", i(1)),
                    ("expire", i(0)),
                    ("updateexpire", i(1)),
                    ("size", i(1024)),
                    ("dmqreplicate", i(1)),
                ]),
            ],
        );

        rpc.add_reply(
            "htable.stats",
            &[],
            vec![
                st(&[
                    ("name", s("ipban")),
                    ("slots", i(256)),
                    ("all", i(12)),
                    ("min", i(0)),
                    ("max", i(2)),
                ]),
                st(&[
                    ("name", s("routes")),
                    ("slots", i(1024)),
                    ("all", i(800)),
                    ("min", i(0)),
                    ("max", i(4)),
                ]),
            ],
        );

        rpc.add_reply("dlg.profile_get_size", &["inbound"], vec![i(12)]);
        rpc.add_reply("dlg.profile_get_size", &["outbound"], vec![i(3)]);

        rpc.add_reply(
            "dlg.stats_active",
            &[],
            vec![st(&[
                ("starting", i(1)),
                ("connecting", i(2)),
                ("answering", i(0)),
                ("ongoing", i(11)),
                ("all", i(14)),
            ])],
        );

        rpc.add_reply("dispatcher.list", &[], vec![dispatcher_list()]);

        rpc
    }

    /// Kamailio with only core, tm and sl: every optional-module command
    /// answers `command not found`.
    pub fn minimal_kamailio() -> Self {
        let mut rpc = Self::new();

        rpc.add_reply("stats.fetch", &["all"], vec![stats_fetch_all()]);

        rpc.add_reply(
            "pkg.stats",
            &[],
            (0..3)
                .map(|n| {
                    st(&[
                        ("entry", i(n)),
                        ("pid", i(1800 + n)),
                        ("rank", i(n - 1)),
                        ("used", i(310_000 + n * 1000)),
                        ("free", i(7_900_000)),
                        ("real_used", i(380_000)),
                        ("total_size", i(8_388_608)),
                        ("total_frags", i(20 + n)),
                    ])
                })
                .collect(),
        );

        rpc.add_reply(
            "core.tcp_info",
            &[],
            vec![st(&[
                ("readers", i(8)),
                ("max_connections", i(4096)),
                ("max_tls_connections", i(2048)),
                ("opened_connections", i(6)),
                ("opened_tls_connections", i(4)),
                ("write_queued_bytes", i(0)),
            ])],
        );

        rpc.add_reply(
            "tm.stats",
            &[],
            vec![st(&[
                ("current", i(9)),
                ("waiting", i(2)),
                ("total", i(640)),
                ("total_local", i(12)),
                ("rpl_received", i(900)),
                ("rpl_generated", i(40)),
                ("rpl_sent", i(1500)),
                ("6xx", i(0)),
                ("5xx", i(3)),
                ("4xx", i(25)),
                ("3xx", i(0)),
                ("2xx", i(600)),
                ("created", i(652)),
                ("freed", i(643)),
                ("delayed_free", i(0)),
            ])],
        );

        rpc.add_reply(
            "sl.stats",
            &[],
            vec![st(&[
                ("200", i(250)),
                ("202", i(0)),
                ("2xx", i(0)),
                ("300", i(0)),
                ("400", i(2)),
                ("404", i(7)),
                ("4xx", i(0)),
                ("500", i(1)),
                ("xxx", i(0)),
            ])],
        );

        rpc.add_reply(
            "core.psa",
            &[],
            vec![
                st(&[
                    ("index", i(0)),
                    ("pid", i(1800)),
                    ("rank", i(0)),
                    ("status", i(1)),
                    ("description", s("main process - attendant")),
                ]),
                st(&[
                    ("index", i(1)),
                    ("pid", i(1801)),
                    ("rank", i(1)),
                    ("status", i(1)),
                    ("description", s("udp receiver child=0 sock=10.0.0.1:5060")),
                ]),
            ],
        );

        rpc.add_reply(
            "core.runinfo",
            &[],
            vec![st(&[
                ("version", s("kamailio 5.7.4 (x86_64/linux)")),
                ("id", s("f8b1ec")),
                ("compiler", s("gcc 12.2.0")),
                ("compiled", s("10:12:44 Jan 10 2024")),
                ("flags", s("USE_TCP, USE_TLS")),
                ("started", s("Mon Jan 15 09:00:00 2024")),
                ("uptime_secs", i(86400)),
            ])],
        );

        rpc
    }
}
