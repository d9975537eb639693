//! Session description parsing
//!
//! Decodes the SDP text used by the RTP-based ingest: per-payload codec
//! metadata from `a=rtpmap` lines, format parameters from `a=fmtp`
//! lines, and the H.264 SPS/PPS carried base64-encoded inside
//! `sprop-parameter-sets`.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::SdpError;

/// One `m=` section with the attributes that follow it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDesc {
    /// Media kind ("video", "audio")
    pub kind: String,
    /// Transport port from the `m=` line
    pub port: u16,
    /// Transport profile ("RTP/AVP")
    pub proto: String,
    /// Format list of the `m=` line (payload types)
    pub fmt: String,
    /// `a=control:` value, if present
    pub control: Option<String>,
    /// `b=AS:` bandwidth in kbps, if present
    pub bandwidth_kbps: Option<u32>,
}

/// Parsed `a=rtpmap` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    /// Optional third field, e.g. the channel count for audio
    pub encoding_parameters: String,
}

/// Parsed `a=fmtp` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fmtp {
    pub format: u8,
    pub parameters: HashMap<String, String>,
}

/// Aggregated session description
#[derive(Debug, Clone, Default)]
pub struct SdpInfo {
    pub media_descs: Vec<MediaDesc>,
    /// payload type -> codec metadata
    pub rtpmaps: HashMap<u8, RtpMap>,
    /// format -> parameter map
    pub fmtps: HashMap<u8, Fmtp>,
}

impl SdpInfo {
    /// The fmtp entry of the first H264 rtpmap, if any
    pub fn video_fmtp(&self) -> Option<&Fmtp> {
        self.rtpmaps
            .values()
            .find(|m| m.encoding_name.eq_ignore_ascii_case("H264"))
            .and_then(|m| self.fmtps.get(&m.payload_type))
    }
}

/// Parse a complete session description
///
/// Lines are CRLF-delimited `k=v` pairs. Unknown attribute lines are
/// skipped; structurally broken lines fail with the offending text.
pub fn parse_sdp(raw: &[u8]) -> Result<SdpInfo, SdpError> {
    let text = String::from_utf8_lossy(raw);
    let mut info = SdpInfo::default();

    for line in text.split("\r\n") {
        let line = line.trim_end_matches('\n').trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| SdpError::MalformedLine(line.to_string()))?;

        match key {
            "m" => {
                let mut fields = value.split_whitespace();
                let kind = fields
                    .next()
                    .ok_or_else(|| SdpError::MalformedLine(line.to_string()))?;
                let port = fields
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| SdpError::MalformedLine(line.to_string()))?;
                let proto = fields
                    .next()
                    .ok_or_else(|| SdpError::MalformedLine(line.to_string()))?;
                let fmt = fields.collect::<Vec<_>>().join(" ");
                info.media_descs.push(MediaDesc {
                    kind: kind.to_string(),
                    port,
                    proto: proto.to_string(),
                    fmt,
                    control: None,
                    bandwidth_kbps: None,
                });
            }
            "b" => {
                if let Some(kbps) = value.strip_prefix("AS:") {
                    if let Some(desc) = info.media_descs.last_mut() {
                        desc.bandwidth_kbps = kbps.parse().ok();
                    }
                }
            }
            "a" => {
                if value.starts_with("rtpmap:") {
                    let rtpmap = parse_rtpmap(value)?;
                    info.rtpmaps.insert(rtpmap.payload_type, rtpmap);
                } else if value.starts_with("fmtp:") {
                    let fmtp = parse_fmtp(line)?;
                    info.fmtps.insert(fmtp.format, fmtp);
                } else if let Some(control) = value.strip_prefix("control:") {
                    if let Some(desc) = info.media_descs.last_mut() {
                        desc.control = Some(control.to_string());
                    }
                }
                // other attributes (a=tool, ...) carry nothing we need
            }
            // v=, o=, s=, c=, t= session-level lines
            _ => {}
        }
    }

    Ok(info)
}

/// Parse an `rtpmap` attribute value, e.g. `rtpmap:96 H264/90000`
///
/// A leading `a=` is tolerated. The part after the payload type splits
/// on `/` into two or three fields.
pub fn parse_rtpmap(line: &str) -> Result<RtpMap, SdpError> {
    let value = line.strip_prefix("a=").unwrap_or(line);
    let value = value
        .strip_prefix("rtpmap:")
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;

    let (pt, rest) = value
        .split_once(' ')
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    let payload_type = pt
        .parse()
        .map_err(|_| SdpError::InvalidNumber(pt.to_string()))?;

    let mut fields = rest.split('/');
    let encoding_name = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    let clock_rate = fields
        .next()
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    let clock_rate = clock_rate
        .parse()
        .map_err(|_| SdpError::InvalidNumber(clock_rate.to_string()))?;
    let encoding_parameters = fields.next().unwrap_or("").to_string();

    Ok(RtpMap {
        payload_type,
        encoding_name: encoding_name.to_string(),
        clock_rate,
        encoding_parameters,
    })
}

/// Parse an `fmtp` attribute line, e.g.
/// `a=fmtp:96 packetization-mode=1; profile-level-id=640020`
pub fn parse_fmtp(line: &str) -> Result<Fmtp, SdpError> {
    let value = line.strip_prefix("a=").unwrap_or(line);
    let value = value
        .strip_prefix("fmtp:")
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;

    let (format, rest) = value
        .split_once(' ')
        .ok_or_else(|| SdpError::MalformedAttribute(line.to_string()))?;
    let format = format
        .parse()
        .map_err(|_| SdpError::InvalidNumber(format.to_string()))?;

    let mut parameters = HashMap::new();
    for pair in rest.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| SdpError::MalformedAttribute(pair.to_string()))?;
        parameters.insert(k.trim().to_string(), v.trim().to_string());
    }

    Ok(Fmtp { format, parameters })
}

/// Extract H.264 SPS and PPS from an fmtp's `sprop-parameter-sets`
///
/// The value is two base64 blobs separated by a comma.
pub fn parse_sps_pps(fmtp: &Fmtp) -> Result<(Vec<u8>, Vec<u8>), SdpError> {
    let sprop = fmtp
        .parameters
        .get("sprop-parameter-sets")
        .ok_or(SdpError::MissingKey("sprop-parameter-sets"))?;

    let (sps, pps) = sprop
        .split_once(',')
        .ok_or_else(|| SdpError::MalformedAttribute(sprop.to_string()))?;

    Ok((BASE64_STANDARD.decode(sps)?, BASE64_STANDARD.decode(pps)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_SDP: &str = concat!(
        "v=0\r\n",
        "o=- 0 0 IN IP6 ::1\r\n",
        "s=No Name\r\n",
        "c=IN IP6 ::1\r\n",
        "t=0 0\r\n",
        "a=tool:libavformat 57.83.100\r\n",
        "m=video 0 RTP/AVP 96\r\n",
        "b=AS:212\r\n",
        "a=rtpmap:96 H264/90000\r\n",
        "a=fmtp:96 packetization-mode=1; sprop-parameter-sets=Z2QAIKzZQMApsBEAAAMAAQAAAwAyDxgxlg==,aOvssiw=; profile-level-id=640020\r\n",
        "a=control:streamid=0\r\n",
        "m=audio 0 RTP/AVP 97\r\n",
        "b=AS:30\r\n",
        "a=rtpmap:97 MPEG4-GENERIC/44100/2\r\n",
        "a=fmtp:97 profile-level-id=1;mode=AAC-hbr;sizelength=13;indexlength=3;indexdeltalength=3; config=1210\r\n",
        "a=control:streamid=1\r\n",
    );

    const GOLDEN_SPS: &[u8] = &[
        0x67, 0x64, 0x00, 0x20, 0xAC, 0xD9, 0x40, 0xC0, 0x29, 0xB0, 0x11, 0x00, 0x00, 0x03, 0x00,
        0x01, 0x00, 0x00, 0x03, 0x00, 0x32, 0x0F, 0x18, 0x31, 0x96,
    ];

    const GOLDEN_PPS: &[u8] = &[0x68, 0xEB, 0xEC, 0xB2, 0x2C];

    #[test]
    fn test_parse_sdp() {
        let info = parse_sdp(GOLDEN_SDP.as_bytes()).unwrap();

        assert_eq!(info.media_descs.len(), 2);
        assert_eq!(info.media_descs[0].kind, "video");
        assert_eq!(info.media_descs[0].proto, "RTP/AVP");
        assert_eq!(info.media_descs[0].fmt, "96");
        assert_eq!(info.media_descs[0].bandwidth_kbps, Some(212));
        assert_eq!(info.media_descs[0].control.as_deref(), Some("streamid=0"));
        assert_eq!(info.media_descs[1].kind, "audio");
        assert_eq!(info.media_descs[1].bandwidth_kbps, Some(30));

        assert_eq!(info.rtpmaps.len(), 2);
        assert_eq!(info.fmtps.len(), 2);
        assert!(info.video_fmtp().is_some());
    }

    #[test]
    fn test_parse_rtpmap() {
        assert_eq!(
            parse_rtpmap("rtpmap:96 H264/90000").unwrap(),
            RtpMap {
                payload_type: 96,
                encoding_name: "H264".to_string(),
                clock_rate: 90000,
                encoding_parameters: String::new(),
            }
        );
        assert_eq!(
            parse_rtpmap("rtpmap:97 MPEG4-GENERIC/44100/2").unwrap(),
            RtpMap {
                payload_type: 97,
                encoding_name: "MPEG4-GENERIC".to_string(),
                clock_rate: 44100,
                encoding_parameters: "2".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rtpmap_errors() {
        assert!(matches!(
            parse_rtpmap("fmtp:96 x=1"),
            Err(SdpError::MalformedAttribute(_))
        ));
        assert!(matches!(
            parse_rtpmap("rtpmap:abc H264/90000"),
            Err(SdpError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_rtpmap("rtpmap:96 H264"),
            Err(SdpError::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_parse_fmtp() {
        let fmtp = parse_fmtp(
            "a=fmtp:96 packetization-mode=1; sprop-parameter-sets=Z2QAIKzZQMApsBEAAAMAAQAAAwAyDxgxlg==,aOvssiw=; profile-level-id=640020",
        )
        .unwrap();

        assert_eq!(fmtp.format, 96);
        assert_eq!(fmtp.parameters.len(), 3);
        assert_eq!(fmtp.parameters["packetization-mode"], "1");
        assert_eq!(
            fmtp.parameters["sprop-parameter-sets"],
            "Z2QAIKzZQMApsBEAAAMAAQAAAwAyDxgxlg==,aOvssiw="
        );
        assert_eq!(fmtp.parameters["profile-level-id"], "640020");
    }

    #[test]
    fn test_parse_fmtp_aac() {
        let fmtp = parse_fmtp(
            "a=fmtp:97 profile-level-id=1;mode=AAC-hbr;sizelength=13;indexlength=3;indexdeltalength=3; config=1210",
        )
        .unwrap();

        assert_eq!(fmtp.format, 97);
        assert_eq!(fmtp.parameters.len(), 6);
        assert_eq!(fmtp.parameters["mode"], "AAC-hbr");
        assert_eq!(fmtp.parameters["config"], "1210");
    }

    #[test]
    fn test_parse_sps_pps() {
        let fmtp = parse_fmtp(
            "a=fmtp:96 packetization-mode=1; sprop-parameter-sets=Z2QAIKzZQMApsBEAAAMAAQAAAwAyDxgxlg==,aOvssiw=; profile-level-id=640020",
        )
        .unwrap();
        let (sps, pps) = parse_sps_pps(&fmtp).unwrap();

        assert_eq!(sps, GOLDEN_SPS);
        assert_eq!(pps, GOLDEN_PPS);
    }

    #[test]
    fn test_parse_sps_pps_missing_key() {
        let fmtp = parse_fmtp("a=fmtp:96 packetization-mode=1").unwrap();
        assert!(matches!(
            parse_sps_pps(&fmtp),
            Err(SdpError::MissingKey("sprop-parameter-sets"))
        ));
    }

    #[test]
    fn test_parse_sps_pps_bad_base64() {
        let fmtp = parse_fmtp("a=fmtp:96 sprop-parameter-sets=!!!,???").unwrap();
        assert!(matches!(parse_sps_pps(&fmtp), Err(SdpError::Base64(_))));
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            parse_sdp(b"v=0\r\nnot-a-kv-line\r\n"),
            Err(SdpError::MalformedLine(_))
        ));
    }
}
