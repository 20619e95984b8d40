//! Red-packet lifecycle: funding, claiming, exhaustion, timeout refund

mod common;

use common::{auto_settle, ctx, ctx_with};
use dao_server::pay::TransferPurpose;
use dao_server::redpacket::CreatePacketInput;
use dao_server::utils::AppError;
use shared::{PayStatus, RedpacketType};

fn lucky(title: &str, total: i64, amount: &str) -> CreatePacketInput {
    CreatePacketInput {
        title: title.to_string(),
        packet_type: RedpacketType::Lucky,
        total,
        amount: amount.to_string(),
    }
}

fn average(title: &str, total: i64, per_share: &str) -> CreatePacketInput {
    CreatePacketInput {
        title: title.to_string(),
        packet_type: RedpacketType::Average,
        total,
        amount: per_share.to_string(),
    }
}

#[tokio::test]
async fn lucky_packet_claims_conserve_the_total() {
    let t = ctx().await;
    let settler = auto_settle(t.facade().clone(), t.gateway.clone());

    let packet = t
        .facade()
        .redpackets
        .create("0xsender", lucky("gm", 3, "1000"))
        .await
        .expect("create");
    settler.abort();
    assert_eq!(packet.pay_status, PayStatus::Success);
    let key = dao_server::db::models::key_of(&packet.id);

    let mut sum: u128 = 0;
    for claimer in ["0xa", "0xb", "0xc"] {
        let claim = t.facade().redpackets.claim(claimer, &key).await.expect("claim");
        let amount: u128 = claim.amount.parse().expect("numeric claim");
        assert!(amount >= 1);
        sum += amount;
    }
    assert_eq!(sum, 1000);

    // Exhausted: one more claimer bounces
    let err = t.facade().redpackets.claim("0xd", &key).await.unwrap_err();
    assert!(matches!(err, AppError::RedpacketFinished));

    let (after, claims) = t.facade().redpackets.detail(&key).await.expect("detail");
    assert_eq!(after.balance, "0");
    assert_eq!(after.claim_count, 0);
    assert_eq!(claims.len(), 3);
}

#[tokio::test]
async fn average_packet_pays_the_exact_share() {
    let t = ctx().await;
    let settler = auto_settle(t.facade().clone(), t.gateway.clone());

    let packet = t
        .facade()
        .redpackets
        .create("0xsender", average("payday", 4, "250"))
        .await
        .expect("create");
    settler.abort();
    assert_eq!(packet.amount, "1000");
    let key = dao_server::db::models::key_of(&packet.id);

    for claimer in ["0xa", "0xb", "0xc", "0xd"] {
        let claim = t.facade().redpackets.claim(claimer, &key).await.expect("claim");
        assert_eq!(claim.amount, "250");
    }
}

#[tokio::test]
async fn repeat_claim_returns_the_existing_share() {
    let t = ctx().await;
    let settler = auto_settle(t.facade().clone(), t.gateway.clone());
    let packet = t
        .facade()
        .redpackets
        .create("0xsender", lucky("hi", 5, "500"))
        .await
        .expect("create");
    settler.abort();
    let key = dao_server::db::models::key_of(&packet.id);

    let first = t.facade().redpackets.claim("0xa", &key).await.expect("claim");
    let second = t.facade().redpackets.claim("0xa", &key).await.expect("claim again");
    assert_eq!(first.amount, second.amount);

    let (after, claims) = t.facade().redpackets.detail(&key).await.expect("detail");
    assert_eq!(claims.len(), 1);
    assert_eq!(after.claim_count, 4);
}

#[tokio::test]
async fn funding_failure_marks_the_packet_failed() {
    let t = ctx().await;
    t.gateway
        .fail
        .store(true, std::sync::atomic::Ordering::Relaxed);

    let err = t
        .facade()
        .redpackets
        .create("0xsender", lucky("nope", 2, "100"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn bad_amounts_are_rejected_up_front() {
    let t = ctx().await;
    // Lucky amount smaller than the share count cannot give a unit each
    let err = t
        .facade()
        .redpackets
        .create("0xsender", lucky("thin", 10, "5"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)));

    let err = t
        .facade()
        .redpackets
        .create("0xsender", average("zero", 2, "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)));
}

#[tokio::test]
async fn timed_out_packet_refunds_the_balance_and_stops_claims() {
    // TTL 0: the packet is expirable the moment it settles
    let t = ctx_with(|c| c.redpacket_ttl_secs = 0).await;
    let settler = auto_settle(t.facade().clone(), t.gateway.clone());
    let packet = t
        .facade()
        .redpackets
        .create("0xsender", lucky("late", 2, "300"))
        .await
        .expect("create");
    settler.abort();
    let key = dao_server::db::models::key_of(&packet.id);

    let expired = t.facade().redpackets.expire_and_refund().await.expect("sweep");
    assert_eq!(expired, 1);

    // The full balance went back to the sender
    let refunds: Vec<_> = t
        .gateway
        .sent()
        .into_iter()
        .filter(|r| r.purpose == TransferPurpose::RefundRedpacket)
        .collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, "300");
    assert_eq!(refunds[0].to, "0xsender");

    let err = t.facade().redpackets.claim("0xa", &key).await.unwrap_err();
    assert!(matches!(err, AppError::RedpacketFinished));

    // A second sweep does not refund twice
    t.facade().redpackets.expire_and_refund().await.expect("sweep");
    let refunds = t
        .gateway
        .sent()
        .into_iter()
        .filter(|r| r.purpose == TransferPurpose::RefundRedpacket)
        .count();
    assert_eq!(refunds, 1);
}

#[tokio::test]
async fn claims_are_blocked_until_the_funding_settles() {
    let t = ctx().await;
    // No settler here: submit the packet, fail the webhook by hand
    let facade = t.facade().clone();
    let gateway = t.gateway.clone();
    let failer = tokio::spawn(async move {
        loop {
            for req in gateway.sent() {
                if req.purpose == TransferPurpose::SendRedpacket {
                    let _ = facade
                        .redpackets
                        .handle_notify(&req.order_id, "tx_failed", false)
                        .await;
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    });

    let err = t
        .facade()
        .redpackets
        .create("0xsender", lucky("unpaid", 2, "100"))
        .await
        .unwrap_err();
    failer.abort();
    assert!(matches!(err, AppError::PayNotify(_)));
}
