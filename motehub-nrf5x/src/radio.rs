//! The nRF radio in proprietary 250 kbit mode.
//!
//! Implements [`RadioController`] over the RADIO peripheral. The driver holds the single packet
//! buffer the radio DMA works on and translates the typed operations onto register writes; it
//! performs no sequencing of its own.
//!
//! The frame layout on the air (fixed 10-byte payload, no S0/LENGTH/S1 fields):
//!
//! ```notrust
//! +----------+---------+--------+--------------+---------+
//! | Preamble |  Base   | Prefix |   Payload    |   CRC   |
//! |  (1 B)   |  (2 B)  | (1 B)  |    (10 B)    |  (3 B)  |
//! +----------+---------+--------+--------------+---------+
//!             \                /
//!              \------+------ /
//!                     |
//!            logical address 0
//! ```

use crate::pac::RADIO;
use core::sync::atomic::{compiler_fence, Ordering};
use motehub::frame::FRAME_LEN;
use motehub::radio::{
    Interrupts, RadioConfig, RadioController, RadioEvent, RadioState, Shorts, TxPower,
};

/// The packet buffer shared by RX and TX.
pub type PacketBuffer = [u8; FRAME_LEN];

/// Register value of a `TXPOWER` setting (two's complement dBm).
fn txpower_bits(power: TxPower) -> u8 {
    match power {
        TxPower::Neg30dBm => 0xD8,
        TxPower::Neg20dBm => 0xEC,
        TxPower::Neg16dBm => 0xF0,
        TxPower::Neg12dBm => 0xF4,
        TxPower::Neg8dBm => 0xF8,
        TxPower::Neg4dBm => 0xFC,
        TxPower::ZerodBm => 0x00,
        TxPower::Pos4dBm => 0x04,
    }
}

/// An interface to the nRF radio speaking the mote protocol.
pub struct SensorRadio {
    radio: RADIO,
    buf: &'static mut PacketBuffer,
}

impl SensorRadio {
    /// Takes ownership of the radio peripheral and the packet buffer.
    ///
    /// The radio is not touched here: outside of granted slots it belongs to the BLE host, and
    /// the state machine powers it on itself at every slot start.
    pub fn new(radio: RADIO, buf: &'static mut PacketBuffer) -> Self {
        Self { radio, buf }
    }
}

impl RadioController for SensorRadio {
    fn power_on(&mut self) {
        self.radio.power.write(|w| w.power().enabled());
    }

    fn power_off(&mut self) {
        self.radio.power.write(|w| w.power().disabled());
    }

    fn configure(&mut self, config: &RadioConfig) {
        unsafe {
            self.radio
                .packetptr
                .write(|w| w.bits(self.buf.as_ptr() as u32));
            self.radio
                .frequency
                .write(|w| w.frequency().bits((config.frequency_mhz - 2400) as u8));
            self.radio.mode.write(|w| w.mode().nrf_250kbit());

            // No S0, LENGTH or S1 on the air; the payload is all there is.
            self.radio.pcnf0.reset();
            self.radio.pcnf1.write(|w| {
                w.maxlen()
                    .bits(FRAME_LEN as u8)
                    .statlen()
                    .bits(FRAME_LEN as u8)
                    .balen()
                    .bits(2)
                    .endian()
                    .little()
            });

            self.radio.base0.write(|w| w.bits(config.base_address));
            self.radio
                .prefix0
                .write(|w| w.ap0().bits(config.address_prefix));
            self.radio.txaddress.write(|w| w.txaddress().bits(0));
            self.radio.rxaddresses.write(|w| w.addr0().enabled());

            self.radio.crccnf.write(|w| w.len().three());
            self.radio.crcpoly.write(|w| w.crcpoly().bits(config.crc_poly));
            self.radio.crcinit.write(|w| w.crcinit().bits(config.crc_init));

            self.radio
                .txpower
                .write(|w| w.txpower().bits(txpower_bits(config.tx_power)));
        }
    }

    fn state(&self) -> RadioState {
        RadioState::from(self.radio.state.read().bits())
    }

    fn set_shorts(&mut self, shorts: Shorts) {
        self.radio.shorts.write(|w| unsafe { w.bits(shorts.bits()) });
    }

    fn set_interrupts(&mut self, mask: Interrupts) {
        self.radio.intenclr.write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        if !mask.is_empty() {
            self.radio.intenset.write(|w| unsafe { w.bits(mask.bits()) });
        }
    }

    fn enable_rx(&mut self) {
        self.radio.tasks_rxen.write(|w| unsafe { w.bits(1) });
    }

    fn enable_tx(&mut self) {
        // "Preceding reads and writes cannot be moved past subsequent writes." The ACK bytes
        // must be in the buffer before the radio ramps up.
        compiler_fence(Ordering::Release);
        self.radio.tasks_txen.write(|w| unsafe { w.bits(1) });
    }

    fn start(&mut self) {
        self.radio.tasks_start.write(|w| unsafe { w.bits(1) });
    }

    fn disable(&mut self) {
        self.radio.tasks_disable.write(|w| unsafe { w.bits(1) });
    }

    fn take_event(&mut self, event: RadioEvent) -> bool {
        let pending = match event {
            RadioEvent::End => self.radio.events_end.read().bits() != 0,
            RadioEvent::Disabled => self.radio.events_disabled.read().bits() != 0,
        };
        if pending {
            // "Subsequent reads and writes cannot be moved ahead of preceding reads." The
            // received frame is read out right after this returns.
            compiler_fence(Ordering::Acquire);
            self.clear_event(event);
        }
        pending
    }

    fn clear_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::End => self.radio.events_end.reset(),
            RadioEvent::Disabled => self.radio.events_disabled.reset(),
        }
    }

    fn crc_ok(&self) -> bool {
        self.radio.crcstatus.read().crcstatus().is_crcok()
    }

    fn rx_match_zero(&self) -> bool {
        self.radio.rxmatch.read().rxmatch().bits() == 0
    }

    fn packet_buf(&mut self) -> &mut [u8; FRAME_LEN] {
        &mut *self.buf
    }
}
