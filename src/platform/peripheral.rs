use core::future::pending;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_io::ErrorType;
use log::*;
use trouble_host::{
    gatt::{GattConnection, GattConnectionEvent, GattEvent},
    prelude::{AttErrorCode, Advertisement, DefaultPacketPool, Peripheral},
    Controller, PacketPool,
};

use super::gatt::Server;
use super::stack::{advertisement_parameters, TroubleStack};
use crate::bluetooth::{
    AdvertisingParams, AttHandle, BdAddr, ConnId, GapEvent, GattServer, GattStack, GattStatus,
    GattsEvent,
};
use crate::errors::PeripheralError;
use crate::led::Feedback;
use crate::messages::{discard_pending_notifications, NOTIFY_CHANNEL};
use crate::payload::PAYLOAD_LEN;

const ADVERTISE_RETRY_DELAY: Duration = Duration::from_secs(1);

async fn advertise<'values, 'server, C, M, F>(
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server Server<'values>,
    gatt: &mut GattServer<'_, M, F>,
    stack: &mut TroubleStack<'_, '_>,
    params: &AdvertisingParams,
) -> Result<
    GattConnection<'values, 'server, DefaultPacketPool>,
    PeripheralError<<C as ErrorType>::Error>,
>
where
    C: Controller,
    M: RawMutex,
    F: Feedback,
{
    let payload = stack.ad_payload();
    let advertiser = peripheral
        .advertise(
            &advertisement_parameters(params),
            Advertisement::ConnectableScannableUndirected {
                adv_data: payload.adv_data(),
                scan_data: payload.scan_data(),
            },
        )
        .await
        .map_err(PeripheralError::AdvertiserError)?;

    gatt.handle_gap_event(
        stack,
        GapEvent::AdvStartComplete {
            status: GattStatus::Ok,
        },
    );
    info!("[Peripheral] BLE advertising started...");

    let connection = advertiser
        .accept()
        .await
        .map_err(PeripheralError::ConnectionError)?;

    connection
        .with_attribute_server(server)
        .map_err(PeripheralError::GattConnectionError)
}

/// Translates trouble-host connection events into core events until the
/// peer disconnects.
async fn gatt_events_task<M, F, P>(
    server: &Server<'_>,
    gatt: &mut GattServer<'_, M, F>,
    stack: &mut TroubleStack<'_, '_>,
    gatt_connection: &GattConnection<'_, '_, P>,
    conn_id: ConnId,
    remote: BdAddr,
) where
    M: RawMutex,
    F: Feedback,
    P: PacketPool,
{
    let sample_handle = server.sensor_service.sample.handle;
    loop {
        match gatt_connection.next().await {
            GattConnectionEvent::Disconnected { reason } => {
                let event = GattsEvent::Disconnect {
                    conn_id,
                    remote,
                    reason: reason.into_inner(),
                };
                gatt.handle_gatts_event(stack, event);
                stack.drain(gatt);
                break;
            }
            GattConnectionEvent::Gatt { event } => {
                let trans_id = stack.next_trans_id();
                let handle = match &event {
                    GattEvent::Read(read) => {
                        let handle = AttHandle(read.handle());
                        gatt.handle_gatts_event(
                            stack,
                            GattsEvent::Read {
                                conn_id,
                                trans_id,
                                handle,
                            },
                        );
                        Some(handle)
                    }
                    GattEvent::Write(write) => {
                        let handle = AttHandle(write.handle());
                        gatt.handle_gatts_event(
                            stack,
                            GattsEvent::Write {
                                conn_id,
                                trans_id,
                                handle,
                                value: write.data(),
                                need_rsp: true,
                            },
                        );
                        Some(handle)
                    }
                    _ => None,
                };

                let reply = stack.take_reply();
                let result = match reply {
                    Some(reply) if !reply.status.is_ok() => {
                        event.reject(AttErrorCode::UNLIKELY_ERROR)
                    }
                    Some(reply) => {
                        if let (Some(value), Some(AttHandle(h))) = (reply.value(), handle) {
                            if h == sample_handle {
                                if let Ok(sample) = <[u8; PAYLOAD_LEN]>::try_from(value) {
                                    if let Err(e) =
                                        server.sensor_service.sample.set(server, &sample)
                                    {
                                        warn!("[Peripheral] Could not store sample: {:?}", e);
                                    }
                                }
                            }
                        }
                        event.accept()
                    }
                    None => event.accept(),
                };
                match result {
                    Ok(reply) => reply.send().await,
                    Err(e) => warn!("[Peripheral] Error sending GATT response: {:?}", e),
                }
            }
            _ => {}
        }
    }
}

async fn gatt_notify_task<P: PacketPool>(
    server: &Server<'_>,
    gatt_connection: &GattConnection<'_, '_, P>,
    conn_id: ConnId,
) {
    let receiver = NOTIFY_CHANNEL.receiver();
    loop {
        let outbound = receiver.receive().await;
        if outbound.target.conn_id != conn_id {
            warn!(
                "[Peripheral] Dropping notification for stale connection {}",
                outbound.target.conn_id.0
            );
            continue;
        }

        if let Err(e) = server
            .sensor_service
            .sample
            .notify(gatt_connection, &outbound.value)
            .await
        {
            error!("[Peripheral] Could not send sample notification: {:?}", e);
        }
    }
}

pub async fn ble_peripheral_task<'a, C, M, F>(
    server: &Server<'a>,
    peripheral: &mut Peripheral<'a, C, DefaultPacketPool>,
    gatt: &mut GattServer<'_, M, F>,
) where
    C: Controller,
    M: RawMutex,
    F: Feedback,
{
    info!("[Peripheral] Bringing up GATT server");
    let mut stack = TroubleStack::new(server);
    gatt.start(&mut stack);
    stack.drain(gatt);

    loop {
        let Some(params) = stack.take_advertise_request() else {
            error!("[Peripheral] Advertising was never requested, staying idle");
            pending::<()>().await;
            continue;
        };

        let gatt_connection = match advertise(peripheral, server, gatt, &mut stack, &params).await
        {
            Ok(gatt_connection) => gatt_connection,
            Err(e) => {
                error!("[Peripheral] {}", e);
                gatt.handle_gap_event(
                    &mut stack,
                    GapEvent::AdvStartComplete {
                        status: GattStatus::Error(0xff),
                    },
                );
                Timer::after(ADVERTISE_RETRY_DELAY).await;
                if let Err(e) = stack.start_advertising(&params) {
                    error!("[Peripheral] Could not re-request advertising: {:?}", e);
                }
                continue;
            }
        };

        let raw = gatt_connection.raw();
        let conn_id = ConnId(raw.handle().raw());
        let remote = BdAddr(raw.peer_address().into_inner());
        let stale = discard_pending_notifications();
        if stale > 0 {
            warn!("[Peripheral] Dropped {} notifications queued before connect", stale);
        }
        gatt.handle_gatts_event(&mut stack, GattsEvent::Connect { conn_id, remote });

        match select(
            gatt_events_task(server, gatt, &mut stack, &gatt_connection, conn_id, remote),
            gatt_notify_task(server, &gatt_connection, conn_id),
        )
        .await
        {
            Either::First(_) => {
                info!("[Peripheral] Gatt Event Task ended.")
            }
            Either::Second(_) => {
                info!("[Peripheral] Gatt Notify Task ended.")
            }
        }
    }
}
