use std::{collections::HashMap, fmt, io::Read};

use bitfield_struct::bitfield;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use shared_definitions::{
    controller::ArmStickDirection,
    tuning::{
        ArmSettings, ControlLimits, ControllerGainSet, OutputMixerConfig, PIGains,
        PitchRollLimit, PitchRollYawLimit, CONTROL_NUMBER_OF_CONTROLLERS,
    },
};

use crate::{
    config::{constants::RECORD_VERSION, parameters::ControlConfiguration},
    util::error::{AppError, AppResult},
};

/// Four ASCII characters naming a stored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey([u8; 4]);

impl RecordKey {
    pub const fn new(key: &[u8; 4]) -> Self {
        Self(*key)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl TryFrom<&str> for RecordKey {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes: [u8; 4] = value
            .as_bytes()
            .try_into()
            .map_err(|_| AppError::InvalidRecordKey)?;
        if !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(AppError::InvalidRecordKey);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{}", byte as char)?;
        }
        Ok(())
    }
}

pub const ARM_SETTINGS_KEY: RecordKey = RecordKey::new(b"CONA");
pub const CONTROLLER_GAINS_KEY: RecordKey = RecordKey::new(b"CONP");
pub const CONTROL_LIMITS_KEY: RecordKey = RecordKey::new(b"CONL");
pub const OUTPUT_MIXER_KEY: RecordKey = RecordKey::new(b"CONM");

/// Prefix of every stored record, little-endian on the medium.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub length: u16,
    /// XOR of all payload bytes
    pub checksum: u8,
}

const RECORD_HEADER_SIZE: usize = 4;

fn payload_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Byte-block storage addressed by record key, e.g. a flash page driver.
pub trait ParameterStorage {
    fn identity(&mut self) -> AppResult<u32>;
    fn read(&mut self, key: RecordKey) -> AppResult<Vec<u8>>;
    fn write(&mut self, key: RecordKey, data: &[u8]) -> AppResult<()>;
}

/// RAM backed storage for host builds and tests.
pub struct MemoryParameterStorage {
    identity: u32,
    page_capacity: usize,
    records: HashMap<RecordKey, Vec<u8>>,
}

impl MemoryParameterStorage {
    pub fn new(identity: u32, page_capacity: usize) -> Self {
        Self {
            identity,
            page_capacity,
            records: HashMap::new(),
        }
    }

    pub fn raw_record(&self, key: RecordKey) -> Option<&[u8]> {
        self.records.get(&key).map(Vec::as_slice)
    }

    pub fn insert_raw(&mut self, key: RecordKey, data: Vec<u8>) {
        self.records.insert(key, data);
    }
}

impl ParameterStorage for MemoryParameterStorage {
    fn identity(&mut self) -> AppResult<u32> {
        Ok(self.identity)
    }

    fn read(&mut self, key: RecordKey) -> AppResult<Vec<u8>> {
        self.records
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::RecordMissing(key.to_string()))
    }

    fn write(&mut self, key: RecordKey, data: &[u8]) -> AppResult<()> {
        if data.len() > self.page_capacity {
            return Err(AppError::WriteTooLarge {
                key: key.to_string(),
                len: data.len(),
                capacity: self.page_capacity,
            });
        }
        self.records.insert(key, data.to_vec());
        Ok(())
    }
}

/// A configuration block with a fixed binary layout.
pub trait ParameterRecord: Sized {
    const KEY: RecordKey;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()>;
    fn read_payload(input: &mut &[u8]) -> AppResult<Self>;
}

fn decode_error(key: RecordKey, reason: &'static str) -> AppError {
    AppError::RecordDecode {
        key: key.to_string(),
        reason,
    }
}

fn read_f32<R: ParameterRecord>(input: &mut &[u8]) -> AppResult<f32> {
    input
        .read_f32::<LittleEndian>()
        .map_err(|_| decode_error(R::KEY, "truncated payload"))
}

fn read_u8<R: ParameterRecord>(input: &mut &[u8]) -> AppResult<u8> {
    input
        .read_u8()
        .map_err(|_| decode_error(R::KEY, "truncated payload"))
}

impl ParameterRecord for ArmSettings {
    const KEY: RecordKey = ARM_SETTINGS_KEY;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_f32::<LittleEndian>(self.stick_threshold)?;
        out.write_f32::<LittleEndian>(self.armed_min_throttle)?;
        out.write_u8(self.stick_direction as u8)?;
        out.write_u8(self.arm_stick_time)?;
        out.write_u8(self.arm_zero_throttle_timeout)
    }

    fn read_payload(input: &mut &[u8]) -> AppResult<Self> {
        let stick_threshold = read_f32::<Self>(input)?;
        let armed_min_throttle = read_f32::<Self>(input)?;
        let stick_direction = ArmStickDirection::try_from(read_u8::<Self>(input)?)
            .map_err(|_| decode_error(Self::KEY, "unknown stick direction"))?;
        Ok(Self {
            stick_threshold,
            armed_min_throttle,
            stick_direction,
            arm_stick_time: read_u8::<Self>(input)?,
            arm_zero_throttle_timeout: read_u8::<Self>(input)?,
        })
    }
}

impl ParameterRecord for ControllerGainSet {
    const KEY: RecordKey = CONTROLLER_GAINS_KEY;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        for gains in self.to_flat() {
            out.write_f32::<LittleEndian>(gains.kp)?;
            out.write_f32::<LittleEndian>(gains.ki)?;
            out.write_f32::<LittleEndian>(gains.output_min)?;
            out.write_f32::<LittleEndian>(gains.output_max)?;
        }
        Ok(())
    }

    fn read_payload(input: &mut &[u8]) -> AppResult<Self> {
        let mut flat = [PIGains::default(); CONTROL_NUMBER_OF_CONTROLLERS];
        for gains in flat.iter_mut() {
            *gains = PIGains::new(
                read_f32::<Self>(input)?,
                read_f32::<Self>(input)?,
                read_f32::<Self>(input)?,
                read_f32::<Self>(input)?,
            );
        }
        Ok(Self::from_flat(&flat))
    }
}

impl ParameterRecord for ControlLimits {
    const KEY: RecordKey = CONTROL_LIMITS_KEY;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        for value in [
            self.max_angle.pitch,
            self.max_angle.roll,
            self.max_rate.pitch,
            self.max_rate.roll,
            self.max_rate.yaw,
            self.max_rate_attitude.pitch,
            self.max_rate_attitude.roll,
        ] {
            out.write_f32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    fn read_payload(input: &mut &[u8]) -> AppResult<Self> {
        Ok(Self {
            max_angle: PitchRollLimit {
                pitch: read_f32::<Self>(input)?,
                roll: read_f32::<Self>(input)?,
            },
            max_rate: PitchRollYawLimit {
                pitch: read_f32::<Self>(input)?,
                roll: read_f32::<Self>(input)?,
                yaw: read_f32::<Self>(input)?,
            },
            max_rate_attitude: PitchRollLimit {
                pitch: read_f32::<Self>(input)?,
                roll: read_f32::<Self>(input)?,
            },
        })
    }
}

impl ParameterRecord for OutputMixerConfig {
    const KEY: RecordKey = OUTPUT_MIXER_KEY;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        for weight in self.weights.iter().flatten() {
            out.write_f32::<LittleEndian>(*weight)?;
        }
        Ok(())
    }

    fn read_payload(input: &mut &[u8]) -> AppResult<Self> {
        let mut mixer = Self::default();
        for weight in mixer.weights.iter_mut().flatten() {
            *weight = read_f32::<Self>(input)?;
        }
        Ok(mixer)
    }
}

pub fn encode_record<R: ParameterRecord>(record: &R) -> AppResult<Vec<u8>> {
    let mut payload = Vec::new();
    record.write_payload(&mut payload)?;
    let length = u16::try_from(payload.len()).map_err(|_| AppError::WriteTooLarge {
        key: R::KEY.to_string(),
        len: payload.len(),
        capacity: u16::MAX as usize,
    })?;

    let header = RecordHeader::new()
        .with_version(RECORD_VERSION)
        .with_length(length)
        .with_checksum(payload_checksum(&payload));

    let mut bytes = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    bytes.write_u32::<LittleEndian>(header.into_bits())?;
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode_record<R: ParameterRecord>(bytes: &[u8]) -> AppResult<R> {
    let mut input = bytes;
    let header = RecordHeader::from_bits(
        input
            .read_u32::<LittleEndian>()
            .map_err(|_| decode_error(R::KEY, "truncated header"))?,
    );

    if header.version() != RECORD_VERSION {
        return Err(decode_error(R::KEY, "unsupported version"));
    }
    if header.length() as usize != input.len() {
        return Err(decode_error(R::KEY, "length mismatch"));
    }
    if header.checksum() != payload_checksum(input) {
        return Err(decode_error(R::KEY, "checksum mismatch"));
    }

    let record = R::read_payload(&mut input)?;
    let mut trailing = [0_u8; 1];
    if input.read(&mut trailing)? != 0 {
        return Err(decode_error(R::KEY, "trailing bytes"));
    }
    Ok(record)
}

/// Control parameter persistence on top of a [`ParameterStorage`].
pub struct ControlParameterStore<S: ParameterStorage> {
    storage: S,
}

impl<S: ParameterStorage> ControlParameterStore<S> {
    /// Fails when the medium does not identify as the expected device.
    pub fn open(mut storage: S, expected_identity: u32) -> AppResult<Self> {
        let found = storage.identity()?;
        if found != expected_identity {
            return Err(AppError::StorageIdentity {
                expected: expected_identity,
                found,
            });
        }
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn read_record<R: ParameterRecord>(&mut self) -> AppResult<R> {
        let bytes = self.storage.read(R::KEY)?;
        decode_record(&bytes)
    }

    pub fn write_record<R: ParameterRecord>(&mut self, record: &R) -> AppResult<()> {
        let bytes = encode_record(record)?;
        self.storage.write(R::KEY, &bytes)
    }

    /// Replaces each block of `config` that reads back intact. Blocks that
    /// are missing or corrupt keep their current value.
    pub fn load_into(&mut self, config: &mut ControlConfiguration) {
        fn apply<R: ParameterRecord>(result: AppResult<R>, target: &mut R) {
            match result {
                Ok(record) => *target = record,
                Err(error) => log::debug!("Keeping default {}: {}", R::KEY, error),
            }
        }

        apply(self.read_record(), &mut config.arm_settings);
        apply(self.read_record(), &mut config.gains);
        apply(self.read_record(), &mut config.limits);
        apply(self.read_record(), &mut config.mixer);
    }

    /// Writes every block, `CONA`, `CONP`, `CONL`, `CONM` in that order.
    pub fn save(&mut self, config: &ControlConfiguration) -> AppResult<()> {
        self.write_record(&config.arm_settings)?;
        self.write_record(&config.gains)?;
        self.write_record(&config.limits)?;
        self.write_record(&config.mixer)?;
        log::info!("Control parameters saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::constants::{STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY},
        output::mixer::quadcopter_x_mixer,
    };

    fn store() -> ControlParameterStore<MemoryParameterStorage> {
        let storage = MemoryParameterStorage::new(STORAGE_IDENTITY, STORAGE_PAGE_CAPACITY);
        ControlParameterStore::open(storage, STORAGE_IDENTITY).unwrap()
    }

    fn tuned_configuration() -> ControlConfiguration {
        let mut config = ControlConfiguration::default();
        config.arm_settings = ArmSettings {
            stick_threshold: 0.1,
            armed_min_throttle: 0.05,
            stick_direction: ArmStickDirection::YawMax,
            arm_stick_time: 1,
            arm_zero_throttle_timeout: 10,
        };
        config.gains.rate = [PIGains::symmetric(0.2, 0.05, 1.0); 3];
        config.limits.max_angle = PitchRollLimit {
            pitch: 30.0,
            roll: 25.0,
        };
        config.mixer = quadcopter_x_mixer();
        config
    }

    #[test]
    fn record_keys_are_four_ascii_characters() {
        assert_eq!(RecordKey::try_from("CONA").unwrap(), ARM_SETTINGS_KEY);
        assert_eq!(ARM_SETTINGS_KEY.to_string(), "CONA");
        assert!(RecordKey::try_from("CON").is_err());
        assert!(RecordKey::try_from("CONAB").is_err());
    }

    #[test]
    fn header_layout() {
        let bytes = encode_record(&ControlLimits::default()).unwrap();
        // version, length (7 floats), checksum of an all-zero payload
        assert_eq!(&bytes[..4], &[RECORD_VERSION, 28, 0, 0]);
        assert_eq!(bytes.len(), 4 + 28);
    }

    #[test]
    fn saved_configuration_loads_back() {
        let mut store = store();
        let config = tuned_configuration();
        store.save(&config).unwrap();

        let mut loaded = ControlConfiguration::default();
        store.load_into(&mut loaded);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_blocks_keep_defaults() {
        let mut store = store();
        store.write_record(&tuned_configuration().limits).unwrap();

        let mut loaded = ControlConfiguration::default();
        store.load_into(&mut loaded);
        assert_eq!(loaded.limits, tuned_configuration().limits);
        assert_eq!(loaded.arm_settings, ArmSettings::default());
        assert_eq!(loaded.mixer, OutputMixerConfig::default());
    }

    #[test]
    fn corrupt_block_is_rejected() {
        let mut store = store();
        store.write_record(&tuned_configuration().arm_settings).unwrap();

        let mut bytes = store
            .storage()
            .raw_record(ARM_SETTINGS_KEY)
            .unwrap()
            .to_vec();
        bytes[6] ^= 0xFF;
        store.storage_mut().insert_raw(ARM_SETTINGS_KEY, bytes);

        assert!(matches!(
            store.read_record::<ArmSettings>(),
            Err(AppError::RecordDecode {
                reason: "checksum mismatch",
                ..
            })
        ));

        let mut loaded = ControlConfiguration::default();
        store.load_into(&mut loaded);
        assert_eq!(loaded.arm_settings, ArmSettings::default());
    }

    #[test]
    fn unknown_stick_direction_is_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0.1_f32.to_le_bytes());
        payload.extend_from_slice(&0.0_f32.to_le_bytes());
        payload.extend_from_slice(&[9, 1, 1]);

        let header = RecordHeader::new()
            .with_version(RECORD_VERSION)
            .with_length(payload.len() as u16)
            .with_checksum(payload_checksum(&payload));
        let mut bytes = header.into_bits().to_le_bytes().to_vec();
        bytes.extend_from_slice(&payload);

        assert!(matches!(
            decode_record::<ArmSettings>(&bytes),
            Err(AppError::RecordDecode {
                reason: "unknown stick direction",
                ..
            })
        ));
    }

    #[test]
    fn identity_mismatch_fails_open() {
        let storage = MemoryParameterStorage::new(0x1234, STORAGE_PAGE_CAPACITY);
        assert!(matches!(
            ControlParameterStore::open(storage, STORAGE_IDENTITY),
            Err(AppError::StorageIdentity { found: 0x1234, .. })
        ));
    }

    #[test]
    fn oversize_write_is_refused() {
        let storage = MemoryParameterStorage::new(STORAGE_IDENTITY, 64);
        let mut store = ControlParameterStore::open(storage, STORAGE_IDENTITY).unwrap();

        assert!(store.write_record(&ControlLimits::default()).is_ok());
        assert!(matches!(
            store.write_record(&ControllerGainSet::default()),
            Err(AppError::WriteTooLarge { len: 196, .. })
        ));
    }
}
