use std::sync::mpsc;

use embedded_svc::http::Method;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::server::{
    Configuration as HttpConfiguration, EspHttpConnection, EspHttpServer, Request,
};
use log::{info, warn};

use super::{EspWifiLink, FirmwareError};
use crate::config::ClockConfig;
use crate::connectivity::Provisioner;
use crate::provisioning::{
    MAX_FORM_LEN, SAVED_HTML, SETUP_AP_SSID, SUBMIT_PATH, parse_submission, render_form,
};

/// Paths phones and laptops probe to detect a captive portal; all get the form.
const FORM_PATHS: [&str; 4] = ["/", "/generate_204", "/hotspot-detect.html", "/ncsi.txt"];

/// Setup access point with a configuration form.
#[derive(Debug, Default)]
pub struct EspProvisioner;

impl EspProvisioner {
    pub fn new() -> Self {
        Self
    }
}

impl Provisioner for EspProvisioner {
    type Link = EspWifiLink;
    type Error = FirmwareError;

    fn provision(
        &mut self,
        link: &mut EspWifiLink,
        current: &ClockConfig,
    ) -> Result<ClockConfig, Self::Error> {
        link.start_access_point(SETUP_AP_SSID)?;

        let (tx, rx) = mpsc::sync_channel::<ClockConfig>(1);
        let server = start_server(current, tx)?;
        info!("setup page ready on '{SETUP_AP_SSID}'");

        let received = rx.recv();
        drop(server);
        link.stop_access_point()?;

        received.map_err(|_| FirmwareError::ProvisioningAborted)
    }
}

fn start_server(
    current: &ClockConfig,
    submissions: mpsc::SyncSender<ClockConfig>,
) -> Result<EspHttpServer<'static>, FirmwareError> {
    let mut server = EspHttpServer::new(&HttpConfiguration::default())?;

    for path in FORM_PATHS {
        let form = render_form(current);
        server.fn_handler::<FirmwareError, _>(path, Method::Get, move |req| {
            req.into_ok_response()?.write_all(form.as_bytes())?;
            Ok(())
        })?;
    }

    let current = current.clone();
    server.fn_handler::<FirmwareError, _>(SUBMIT_PATH, Method::Post, move |mut req| {
        let body = read_body(&mut req)?;
        match parse_submission(&body, &current) {
            Ok(config) => {
                info!("configuration submitted for '{}'", config.wifi_ssid);
                req.into_ok_response()?.write_all(SAVED_HTML.as_bytes())?;
                // A second submission while the first is processed is dropped
                let _ = submissions.try_send(config);
            }
            Err(err) => {
                warn!("rejected setup form: {err}");
                let page = format!("<p>{err}</p>{}", render_form(&current));
                req.into_status_response(400)?.write_all(page.as_bytes())?;
            }
        }
        Ok(())
    })?;

    Ok(server)
}

/// Read at most [`MAX_FORM_LEN`] bytes of the request body.
fn read_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> Result<Vec<u8>, FirmwareError> {
    let mut body = Vec::new();
    let mut chunk = [0_u8; 256];
    while body.len() < MAX_FORM_LEN {
        let read = req.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(MAX_FORM_LEN);
    Ok(body)
}
