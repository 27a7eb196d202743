use crate::types::HitEvent;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// OSC address every hit is sent to.
pub const HIT_ADDR: &str = "/drums/hit";

/// Forwards hits as `/drums/hit <drum:string> <zone:int>` UDP messages.
pub struct OscSender {
    rx: Receiver<HitEvent>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<HitEvent>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        let mut sent: u64 = 0;
        for hit in self.rx.iter() {
            match self.send_hit(&socket, &hit) {
                Ok(()) => sent += 1,
                Err(e) => debug!("OSC send error: {}", e),
            }
        }
        info!("OSC sender shutting down after {} hits", sent);
    }

    fn send_hit(
        &self,
        socket: &UdpSocket,
        hit: &HitEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let buf = rosc::encoder::encode(&hit_packet(hit))?;
        socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

fn hit_packet(hit: &HitEvent) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: HIT_ADDR.to_string(),
        args: vec![
            OscType::String(hit.drum.clone()),
            OscType::Int(hit.zone_index as i32),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snare() -> HitEvent {
        HitEvent {
            zone_index: 3,
            drum: "snare".into(),
            frame_index: 0,
            timestamp_us: 0,
        }
    }

    #[test]
    fn test_hit_packet_layout() {
        match hit_packet(&snare()) {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/drums/hit");
                assert_eq!(m.args, vec![OscType::String("snare".into()), OscType::Int(3)]);
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_sends_over_udp_until_channel_closes() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(snare()).unwrap();
        drop(tx);
        OscSender::new(rx, target).run();

        let mut buf = [0u8; 512];
        let n = listener.recv(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..n]).unwrap();
        assert_eq!(packet, hit_packet(&snare()));
    }
}
