//! Well-known `stats.fetch` statistics and the families they feed.

use super::{StatFamily, StatMapping};
use crate::metrics::MetricKind;

const fn family(
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    labels: &'static [&'static str],
) -> StatFamily {
    StatFamily {
        name,
        help,
        kind,
        labels,
    }
}

const fn labelled(key: &'static str, family: StatFamily, label: &'static str) -> StatMapping {
    StatMapping {
        key,
        family,
        label_value: Some(label),
    }
}

const fn plain(key: &'static str, family: StatFamily) -> StatMapping {
    StatMapping {
        key,
        family,
        label_value: None,
    }
}

const CORE_REQUEST: StatFamily = family(
    "kamailio_core_request_total",
    "Request counters",
    MetricKind::Counter,
    &["method"],
);

const CORE_RCV_REQUEST: StatFamily = family(
    "kamailio_core_rcv_request_total",
    "Received requests by method",
    MetricKind::Counter,
    &["method"],
);

const CORE_REPLY: StatFamily = family(
    "kamailio_core_reply_total",
    "Reply counters",
    MetricKind::Counter,
    &["type"],
);

const CORE_RCV_REPLY: StatFamily = family(
    "kamailio_core_rcv_reply_total",
    "Received replies by code",
    MetricKind::Counter,
    &["code"],
);

const SHM_BYTES: StatFamily = family(
    "kamailio_shm_bytes",
    "Shared memory sizes",
    MetricKind::Gauge,
    &["type"],
);

const SHM_FRAGMENTS: StatFamily = family(
    "kamailio_shm_fragments",
    "Shared memory fragment count",
    MetricKind::Gauge,
    &[],
);

const DNS_FAILED: StatFamily = family(
    "kamailio_dns_failed_request_total",
    "Failed dns requests",
    MetricKind::Counter,
    &[],
);

const BAD_URI: StatFamily = family(
    "kamailio_bad_uri_total",
    "Messages with bad uri",
    MetricKind::Counter,
    &[],
);

const BAD_MSG_HDR: StatFamily = family(
    "kamailio_bad_msg_hdr",
    "Messages with bad message header",
    MetricKind::Counter,
    &[],
);

const SL_REPLY: StatFamily = family(
    "kamailio_sl_reply_total",
    "Stateless replies by code",
    MetricKind::Counter,
    &["code"],
);

const SL_TYPE: StatFamily = family(
    "kamailio_sl_type_total",
    "Stateless replies by type",
    MetricKind::Counter,
    &["type"],
);

const TCP_TOTAL: StatFamily = family(
    "kamailio_tcp_total",
    "TCP connection counters",
    MetricKind::Counter,
    &["type"],
);

const TCP_CONNECTIONS: StatFamily = family(
    "kamailio_tcp_connections",
    "Opened TCP connections",
    MetricKind::Gauge,
    &[],
);

const TCP_WRITEQUEUE: StatFamily = family(
    "kamailio_tcp_writequeue",
    "TCP write queue size",
    MetricKind::Gauge,
    &[],
);

const TMX_CODE: StatFamily = family(
    "kamailio_tmx_code_total",
    "Completed Transaction counters by code",
    MetricKind::Counter,
    &["code"],
);

const TMX_TYPE: StatFamily = family(
    "kamailio_tmx_type_total",
    "Completed Transaction counters by type",
    MetricKind::Counter,
    &["type"],
);

const TMX: StatFamily = family(
    "kamailio_tmx",
    "Ongoing Transactions",
    MetricKind::Gauge,
    &["type"],
);

const TMX_RPL: StatFamily = family(
    "kamailio_tmx_rpl_total",
    "Tmx reply counters",
    MetricKind::Counter,
    &["type"],
);

const DIALOG: StatFamily = family(
    "kamailio_dialog",
    "Ongoing Dialogs",
    MetricKind::Counter,
    &["type"],
);

pub static STAT_MAPPINGS: &[StatMapping] = &[
    // kamailio_core_request_total
    labelled("core.drop_requests", CORE_REQUEST, "drop"),
    labelled("core.err_requests", CORE_REQUEST, "err"),
    labelled("core.fwd_requests", CORE_REQUEST, "fwd"),
    labelled("core.rcv_requests", CORE_REQUEST, "rcv"),
    // kamailio_core_rcv_request_total
    labelled("core.rcv_requests_ack", CORE_RCV_REQUEST, "ack"),
    labelled("core.rcv_requests_bye", CORE_RCV_REQUEST, "bye"),
    labelled("core.rcv_requests_cancel", CORE_RCV_REQUEST, "cancel"),
    labelled("core.rcv_requests_info", CORE_RCV_REQUEST, "info"),
    labelled("core.rcv_requests_invite", CORE_RCV_REQUEST, "invite"),
    labelled("core.rcv_requests_message", CORE_RCV_REQUEST, "message"),
    labelled("core.rcv_requests_notify", CORE_RCV_REQUEST, "notify"),
    labelled("core.rcv_requests_options", CORE_RCV_REQUEST, "options"),
    labelled("core.rcv_requests_prack", CORE_RCV_REQUEST, "prack"),
    labelled("core.rcv_requests_publish", CORE_RCV_REQUEST, "publish"),
    labelled("core.rcv_requests_refer", CORE_RCV_REQUEST, "refer"),
    labelled("core.rcv_requests_register", CORE_RCV_REQUEST, "register"),
    labelled("core.rcv_requests_subscribe", CORE_RCV_REQUEST, "subscribe"),
    labelled("core.rcv_requests_update", CORE_RCV_REQUEST, "update"),
    labelled("core.unsupported_methods", CORE_RCV_REQUEST, "unsupported"),
    // kamailio_core_reply_total
    labelled("core.drop_replies", CORE_REPLY, "drop"),
    labelled("core.err_replies", CORE_REPLY, "err"),
    labelled("core.fwd_replies", CORE_REPLY, "fwd"),
    labelled("core.rcv_replies", CORE_REPLY, "rcv"),
    // kamailio_core_rcv_reply_total
    labelled("core.rcv_replies_18x", CORE_RCV_REPLY, "18x"),
    labelled("core.rcv_replies_1xx", CORE_RCV_REPLY, "1xx"),
    labelled("core.rcv_replies_2xx", CORE_RCV_REPLY, "2xx"),
    labelled("core.rcv_replies_3xx", CORE_RCV_REPLY, "3xx"),
    labelled("core.rcv_replies_401", CORE_RCV_REPLY, "401"),
    labelled("core.rcv_replies_404", CORE_RCV_REPLY, "404"),
    labelled("core.rcv_replies_407", CORE_RCV_REPLY, "407"),
    labelled("core.rcv_replies_408", CORE_RCV_REPLY, "408"),
    labelled("core.rcv_replies_480", CORE_RCV_REPLY, "480"),
    labelled("core.rcv_replies_486", CORE_RCV_REPLY, "486"),
    labelled("core.rcv_replies_4xx", CORE_RCV_REPLY, "4xx"),
    labelled("core.rcv_replies_5xx", CORE_RCV_REPLY, "5xx"),
    labelled("core.rcv_replies_6xx", CORE_RCV_REPLY, "6xx"),
    // kamailio_shm_bytes
    labelled("shmem.free_size", SHM_BYTES, "free"),
    labelled("shmem.max_used_size", SHM_BYTES, "max_used"),
    labelled("shmem.real_used_size", SHM_BYTES, "real_used"),
    labelled("shmem.total_size", SHM_BYTES, "total"),
    labelled("shmem.used_size", SHM_BYTES, "used"),
    // kamailio_shm_fragments
    plain("shmem.fragments", SHM_FRAGMENTS),
    // kamailio_dns_failed_request_total
    plain("dns.failed_dns_request", DNS_FAILED),
    // kamailio_bad_uri_total
    plain("core.bad_URIs_rcvd", BAD_URI),
    // kamailio_bad_msg_hdr
    plain("core.bad_msg_hdr", BAD_MSG_HDR),
    // kamailio_sl_reply_total
    labelled("sl.1xx_replies", SL_REPLY, "1xx"),
    labelled("sl.200_replies", SL_REPLY, "200"),
    labelled("sl.202_replies", SL_REPLY, "202"),
    labelled("sl.2xx_replies", SL_REPLY, "2xx"),
    labelled("sl.300_replies", SL_REPLY, "300"),
    labelled("sl.301_replies", SL_REPLY, "301"),
    labelled("sl.302_replies", SL_REPLY, "302"),
    labelled("sl.3xx_replies", SL_REPLY, "3xx"),
    labelled("sl.400_replies", SL_REPLY, "400"),
    labelled("sl.401_replies", SL_REPLY, "401"),
    labelled("sl.403_replies", SL_REPLY, "403"),
    labelled("sl.404_replies", SL_REPLY, "404"),
    labelled("sl.407_replies", SL_REPLY, "407"),
    labelled("sl.408_replies", SL_REPLY, "408"),
    labelled("sl.483_replies", SL_REPLY, "483"),
    labelled("sl.4xx_replies", SL_REPLY, "4xx"),
    labelled("sl.500_replies", SL_REPLY, "500"),
    labelled("sl.5xx_replies", SL_REPLY, "5xx"),
    labelled("sl.6xx_replies", SL_REPLY, "6xx"),
    // kamailio_sl_type_total
    labelled("sl.failures", SL_TYPE, "failure"),
    labelled("sl.received_ACKs", SL_TYPE, "received_ack"),
    labelled("sl.sent_err_replies", SL_TYPE, "sent_err_reply"),
    labelled("sl.sent_replies", SL_TYPE, "sent_reply"),
    labelled("sl.xxx_replies", SL_TYPE, "xxx_reply"),
    // kamailio_tcp_total
    labelled("tcp.con_reset", TCP_TOTAL, "con_reset"),
    labelled("tcp.con_timeout", TCP_TOTAL, "con_timeout"),
    labelled("tcp.connect_failed", TCP_TOTAL, "connect_failed"),
    labelled("tcp.connect_success", TCP_TOTAL, "connect_success"),
    labelled("tcp.established", TCP_TOTAL, "established"),
    labelled("tcp.local_reject", TCP_TOTAL, "local_reject"),
    labelled("tcp.passive_open", TCP_TOTAL, "passive_open"),
    labelled("tcp.send_timeout", TCP_TOTAL, "send_timeout"),
    labelled("tcp.sendq_full", TCP_TOTAL, "sendq_full"),
    // kamailio_tcp_connections
    plain("tcp.current_opened_connections", TCP_CONNECTIONS),
    // kamailio_tcp_writequeue
    plain("tcp.current_write_queue_size", TCP_WRITEQUEUE),
    // kamailio_tmx_code_total
    labelled("tmx.2xx_transactions", TMX_CODE, "2xx"),
    labelled("tmx.3xx_transactions", TMX_CODE, "3xx"),
    labelled("tmx.4xx_transactions", TMX_CODE, "4xx"),
    labelled("tmx.5xx_transactions", TMX_CODE, "5xx"),
    labelled("tmx.6xx_transactions", TMX_CODE, "6xx"),
    // kamailio_tmx_type_total
    labelled("tmx.UAC_transactions", TMX_TYPE, "uac"),
    labelled("tmx.UAS_transactions", TMX_TYPE, "uas"),
    // kamailio_tmx
    labelled("tmx.active_transactions", TMX, "active"),
    labelled("tmx.inuse_transactions", TMX, "inuse"),
    // kamailio_tmx_rpl_total
    labelled("tmx.rpl_absorbed", TMX_RPL, "absorbed"),
    labelled("tmx.rpl_generated", TMX_RPL, "generated"),
    labelled("tmx.rpl_received", TMX_RPL, "received"),
    labelled("tmx.rpl_relayed", TMX_RPL, "relayed"),
    labelled("tmx.rpl_sent", TMX_RPL, "sent"),
    // kamailio_dialog
    labelled("dialog.active_dialogs", DIALOG, "active_dialogs"),
    labelled("dialog.early_dialogs", DIALOG, "early_dialogs"),
    labelled("dialog.expired_dialogs", DIALOG, "expired_dialogs"),
    labelled("dialog.failed_dialogs", DIALOG, "failed_dialogs"),
    labelled("dialog.processed_dialogs", DIALOG, "processed_dialogs"),
];
