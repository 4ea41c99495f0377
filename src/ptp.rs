//! PTP and Sony SDIO protocol constants, the request/response model and
//! the USB container header.

use packed_struct::prelude::*;

use crate::error::{Error, Result};

/// A PTP request carries at most five 32-bit parameters.
pub const MAX_PARAMS: usize = 5;

/// Operation codes. Standard PTP 1.0 in the 0x1000 band, the Sony SDIO
/// vendor extension in the 0x9200 band.
pub mod op {
    pub const GET_DEVICE_INFO: u16 = 0x1001;
    pub const OPEN_SESSION: u16 = 0x1002;
    pub const CLOSE_SESSION: u16 = 0x1003;
    pub const GET_STORAGE_IDS: u16 = 0x1004;
    pub const GET_STORAGE_INFO: u16 = 0x1005;
    pub const GET_NUM_OBJECTS: u16 = 0x1006;
    pub const GET_OBJECT_HANDLES: u16 = 0x1007;
    pub const GET_OBJECT_INFO: u16 = 0x1008;
    pub const GET_OBJECT: u16 = 0x1009;
    pub const GET_THUMB: u16 = 0x100A;
    pub const DELETE_OBJECT: u16 = 0x100B;
    pub const SEND_OBJECT: u16 = 0x100D;

    pub const SDIO_CONNECT: u16 = 0x9201;
    pub const SDIO_GET_EXT_DEVICE_INFO: u16 = 0x9202;
    pub const SDIO_SET_EXT_DEVICE_PROP_VALUE: u16 = 0x9205;
    pub const SDIO_CONTROL_DEVICE: u16 = 0x9207;
    pub const SDIO_GET_ALL_EXT_DEVICE_PROP_INFO: u16 = 0x9209;
    pub const SDIO_SET_FTP_SETTING_FILE_PASSWORD: u16 = 0x920F;
    pub const SDIO_OPEN_SESSION: u16 = 0x9210;
    pub const SDIO_GET_PARTIAL_LARGE_OBJECT: u16 = 0x9211;
    pub const SDIO_SET_CONTENTS_TRANSFER_MODE: u16 = 0x9212;
    pub const SDIO_GET_DISPLAY_STRING_LIST: u16 = 0x9215;
    pub const SDIO_GET_LENS_INFORMATION: u16 = 0x9223;
}

/// Response codes. 0x2001 is OK; the 0xA101 band is Sony-specific.
pub mod rc {
    pub const OK: u16 = 0x2001;
    pub const GENERAL_ERROR: u16 = 0x2002;
    pub const SESSION_NOT_OPEN: u16 = 0x2003;
    pub const INVALID_TRANSACTION_ID: u16 = 0x2004;
    pub const OPERATION_NOT_SUPPORTED: u16 = 0x2005;
    pub const PARAMETER_NOT_SUPPORTED: u16 = 0x2006;
    pub const INCOMPLETE_TRANSFER: u16 = 0x2007;
    pub const INVALID_STORAGE_ID: u16 = 0x2008;
    pub const INVALID_OBJECT_HANDLE: u16 = 0x2009;
    pub const PROPERTY_NOT_SUPPORTED: u16 = 0x200A;
    pub const STORE_FULL: u16 = 0x200C;
    pub const STORE_READ_ONLY: u16 = 0x200E;
    pub const ACCESS_DENIED: u16 = 0x200F;
    pub const NO_THUMBNAIL_PRESENT: u16 = 0x2010;
    pub const SELF_TEST_FAILED: u16 = 0x2011;
    pub const PARTIAL_DELETION: u16 = 0x2012;
    pub const STORE_NOT_AVAILABLE: u16 = 0x2013;
    pub const SPEC_BY_FORMAT_UNSUPPORTED: u16 = 0x2014;
    pub const NO_VALID_OBJECT_INFO: u16 = 0x2015;
    pub const INVALID_CODE_FORMAT: u16 = 0x2016;
    pub const UNKNOWN_VENDOR_CODE: u16 = 0x2017;
    pub const CAPTURE_ALREADY_TERMINATED: u16 = 0x2018;
    pub const DEVICE_BUSY: u16 = 0x2019;
    pub const INVALID_PARENT_OBJECT: u16 = 0x201A;
    pub const INVALID_DEVICE_PROP_FORMAT: u16 = 0x201B;
    pub const INVALID_DEVICE_PROP_VALUE: u16 = 0x201C;
    pub const INVALID_PARAMETER: u16 = 0x201D;
    pub const SESSION_ALREADY_OPEN: u16 = 0x201E;
    pub const TRANSACTION_CANCELLED: u16 = 0x201F;
    pub const SPEC_DEST_UNSUPPORTED: u16 = 0x2020;

    pub const SDIO_AUTH_FAILED: u16 = 0xA101;
    pub const SDIO_PASSWORD_TOO_LONG: u16 = 0xA102;
    pub const SDIO_PASSWORD_INVALID_CHAR: u16 = 0xA103;
    pub const SDIO_FEATURE_VERSION_INVALID: u16 = 0xA104;
    pub const SDIO_TEMP_STORAGE_FULL: u16 = 0xA105;
    pub const SDIO_CAMERA_STATUS_ERROR: u16 = 0xA106;
}

/// Device property codes used by Sony Alpha cameras. Standard PTP codes in
/// the 0x5000 band, vendor codes in 0xD000/0xE000.
pub mod prop {
    pub const COMPRESSION_SETTING: u16 = 0x5004;
    pub const WHITE_BALANCE: u16 = 0x5005;
    pub const F_NUMBER: u16 = 0x5007;
    pub const FOCUS_MODE: u16 = 0x500A;
    pub const EXPOSURE_METERING_MODE: u16 = 0x500B;
    pub const FLASH_MODE: u16 = 0x500C;
    pub const EXPOSURE_PROGRAM_MODE: u16 = 0x500E;
    pub const EXPOSURE_COMPENSATION: u16 = 0x5010;
    pub const CAPTURE_MODE: u16 = 0x5013;

    pub const FLASH_COMPENSATION: u16 = 0xD200;
    pub const DRO_HDR_MODE: u16 = 0xD201;
    pub const IMAGE_SIZE: u16 = 0xD203;
    pub const SHUTTER_SPEED: u16 = 0xD20D;
    pub const BATTERY_LEVEL: u16 = 0xD20E;
    pub const COLOR_TEMPERATURE: u16 = 0xD20F;
    pub const WHITE_BALANCE_GM: u16 = 0xD210;
    pub const ASPECT_RATIO: u16 = 0xD211;
    pub const AF_STATUS: u16 = 0xD213;
    pub const PREDICTED_MAX_FILE_SIZE: u16 = 0xD214;
    pub const PENDING_FILES: u16 = 0xD215;
    pub const AE_LOCK_STATUS: u16 = 0xD217;
    pub const BATTERY_REMAINING: u16 = 0xD218;
    pub const PICTURE_EFFECT: u16 = 0xD21B;
    pub const WHITE_BALANCE_AB: u16 = 0xD21C;
    pub const MOVIE_REC_STATE: u16 = 0xD21D;
    pub const ISO: u16 = 0xD21E;
    pub const FEL_LOCK_STATUS: u16 = 0xD21F;
    pub const LIVE_VIEW_STATUS: u16 = 0xD221;
    pub const IMAGE_SAVE_DESTINATION: u16 = 0xD222;
    pub const FOCUS_AREA: u16 = 0xD22C;
    pub const FOCUS_MAGNIFY_SCALE: u16 = 0xD22F;
    pub const FOCUS_MAGNIFY_POS: u16 = 0xD230;
    pub const LIVE_VIEW_SETTING_EFFECT: u16 = 0xD231;
    pub const MANUAL_FOCUS_ADJUST_ENABLED: u16 = 0xD235;
    pub const PIXEL_SHIFT_SHOOTING_MODE: u16 = 0xD239;
    pub const PIXEL_SHIFT_SHOOTING_NUMBER: u16 = 0xD23A;
    pub const PIXEL_SHIFT_SHOOTING_INTERVAL: u16 = 0xD23B;
    pub const PIXEL_SHIFT_SHOOTING_STATUS: u16 = 0xD23C;
    pub const PIXEL_SHIFT_SHOOTING_PROGRESS: u16 = 0xD23D;
    pub const PICTURE_PROFILE: u16 = 0xD23F;
    pub const CREATIVE_STYLE: u16 = 0xD240;
    pub const MOVIE_FILE_FORMAT: u16 = 0xD241;
    pub const MOVIE_QUALITY: u16 = 0xD242;
    pub const MEDIA_SLOT1_STATUS: u16 = 0xD248;
    pub const FOCAL_POSITION: u16 = 0xD24C;
    pub const AWB_LOCK_STATUS: u16 = 0xD24E;
    pub const INTERVAL_RECORD_MODE: u16 = 0xD24F;
    pub const INTERVAL_RECORD_STATUS: u16 = 0xD250;
    pub const DEVICE_OVERHEATING_STATE: u16 = 0xD251;
    pub const IMAGE_QUALITY: u16 = 0xD252;
    pub const IMAGE_FILE_FORMAT: u16 = 0xD253;
    pub const FOCUS_MAGNIFY: u16 = 0xD254;
    pub const AF_TRACKING_SENS: u16 = 0xD255;
    pub const MEDIA_SLOT2_STATUS: u16 = 0xD256;
    pub const EXPOSURE_MODE_KEY: u16 = 0xD25A;
    pub const ZOOM_OPERATION_ENABLED: u16 = 0xD25B;
    pub const ZOOM_SCALE: u16 = 0xD25C;
    pub const ZOOM_BAR_INFO: u16 = 0xD25D;
    pub const ZOOM_SETTING: u16 = 0xD25F;
    pub const ZOOM_TYPE_STATUS: u16 = 0xD260;
    pub const WIRELESS_FLASH: u16 = 0xD262;
    pub const RED_EYE_REDUCTION: u16 = 0xD263;
    pub const REMOTE_RESTRICT_STATUS: u16 = 0xD264;
    pub const IMAGE_TRANSFER_SIZE: u16 = 0xD268;
    pub const PC_SAVE_IMAGE: u16 = 0xD269;
    pub const LIVE_VIEW_QUALITY: u16 = 0xD26A;
    pub const CAMERA_SETTING_SAVE_ENABLED: u16 = 0xD271;
    pub const CAMERA_SETTING_READ_ENABLED: u16 = 0xD272;
    pub const CAMERA_SETTING_SAVE_READ_STATE: u16 = 0xD273;
    pub const FORMAT_MEDIA_SLOT1_ENABLED: u16 = 0xD279;
    pub const FORMAT_MEDIA_SLOT2_ENABLED: u16 = 0xD27A;
    pub const FORMAT_MEDIA_PROGRESS: u16 = 0xD27B;
    pub const TOUCH_OPERATION_FUNCTION: u16 = 0xD283;
    pub const REMOTE_TOUCH_ENABLED: u16 = 0xD284;
    pub const REMOTE_TOUCH_CANCEL_ENABLED: u16 = 0xD285;
    pub const MOVIE_FRAME_RATE: u16 = 0xD286;
    pub const COMPRESSED_IMAGE_FILE_FORMAT: u16 = 0xD287;
    pub const RAW_FILE_TYPE: u16 = 0xD288;
    pub const CONTENTS_TRANSFER_ENABLED: u16 = 0xD295;
    pub const LENS_INFORMATION_ENABLED: u16 = 0xE086;
}

/// Control codes. Controls are write-only relative commands driven through
/// `SDIO_ControlDevice`.
pub mod ctrl {
    pub const S1_BUTTON: u16 = 0xD2C1;
    pub const S2_BUTTON: u16 = 0xD2C2;
    pub const AE_LOCK: u16 = 0xD2C3;
    pub const AFL_BUTTON: u16 = 0xD2C4;
    pub const RELEASE_LOCK: u16 = 0xD2C5;
    pub const REQUEST_ONE_SHOOTING: u16 = 0xD2C7;
    pub const MOVIE_RECORD: u16 = 0xD2C8;
    pub const FEL_BUTTON: u16 = 0xD2C9;
    pub const MEDIA_FORMAT: u16 = 0xD2CA;
    pub const FOCUS_MAGNIFIER: u16 = 0xD2CB;
    pub const FOCUS_MAGNIFIER_CANCEL: u16 = 0xD2CC;
    pub const REMOTE_KEY_UP: u16 = 0xD2CD;
    pub const REMOTE_KEY_DOWN: u16 = 0xD2CE;
    pub const REMOTE_KEY_LEFT: u16 = 0xD2CF;
    pub const REMOTE_KEY_RIGHT: u16 = 0xD2D0;
    pub const MANUAL_FOCUS_ADJUST: u16 = 0xD2D1;
    pub const AUTO_FOCUS_HOLD: u16 = 0xD2D2;
    pub const PIXEL_SHIFT_SHOOT_CANCEL: u16 = 0xD2D3;
    pub const PIXEL_SHIFT_SHOOT: u16 = 0xD2D4;
    pub const HFR_STANDBY: u16 = 0xD2D5;
    pub const HFR_RECORD_CANCEL: u16 = 0xD2D6;
    pub const FOCUS_STEP_NEAR: u16 = 0xD2D7;
    pub const FOCUS_STEP_FAR: u16 = 0xD2D8;
    pub const AWB_LOCK: u16 = 0xD2D9;
    pub const FOCUS_AREA_XY: u16 = 0xD2DC;
    pub const ZOOM: u16 = 0xD2DD;
    pub const CUSTOM_WB_CAPTURE_STANDBY: u16 = 0xD2DF;
    pub const CUSTOM_WB_CAPTURE_STANDBY_CANCEL: u16 = 0xD2E0;
    pub const CUSTOM_WB_CAPTURE: u16 = 0xD2E1;
    pub const FORMAT_MEDIA: u16 = 0xD2E2;
    pub const REMOTE_TOUCH_XY: u16 = 0xD2E4;
    pub const REMOTE_TOUCH_CANCEL: u16 = 0xD2E5;
    pub const S1_AND_S2_BUTTON: u16 = 0xD2E6;
    pub const FORMAT_MEDIA_CANCEL: u16 = 0xD2E7;
    pub const SAVE_ZOOM_AND_FOCUS_POSITION: u16 = 0xD2E9;
    pub const LOAD_ZOOM_AND_FOCUS_POSITION: u16 = 0xD2EA;
    pub const APS_C_FULL_TOGGLE: u16 = 0xD2EB;
    pub const COLOR_TEMPERATURE_STEP: u16 = 0xD2EC;
    pub const WHITE_BALANCE_TINT_STEP: u16 = 0xD2ED;
    pub const FOCUS_OPERATION: u16 = 0xD2EF;
    pub const FLICKER_SCAN: u16 = 0xD2F1;
    pub const SETTINGS_RESET: u16 = 0xD2F3;
    pub const PIXEL_MAPPING: u16 = 0xD300;
    pub const POWER_OFF: u16 = 0xD301;
    pub const TIME_CODE_PRESET_RESET: u16 = 0xD302;
    pub const USER_BIT_PRESET_RESET: u16 = 0xD303;
    pub const SENSOR_CLEANING: u16 = 0xD304;
    pub const RESET_PICTURE_PROFILE: u16 = 0xD305;
    pub const RESET_CREATIVE_LOOK: u16 = 0xD306;
    pub const SHUTTER_ECS_NUMBER_STEP: u16 = 0xF000;
    pub const MOVIE_RECORD_TOGGLE: u16 = 0xF001;
    pub const FOCUS_POSITION_CANCEL: u16 = 0xF002;
}

/// Event codes delivered on the interrupt pipe / event socket.
pub mod event {
    pub const STORE_ADDED: u16 = 0x4004;
    pub const STORE_REMOVED: u16 = 0x4005;
    pub const SDIO_OBJECT_ADDED: u16 = 0xC201;
    pub const SDIO_OBJECT_REMOVED: u16 = 0xC202;
    pub const SDIO_DEVICE_PROP_CHANGED: u16 = 0xC203;
    pub const SDIO_DATE_TIME_SETTING_RESULT: u16 = 0xC205;
    pub const SDIO_CAPTURED_EVENT: u16 = 0xC206;
    pub const SDIO_CWB_CAPTURED_RESULT: u16 = 0xC208;
    pub const SDIO_CAMERA_SETTING_READ_RESULT: u16 = 0xC209;
    pub const SDIO_FTP_SETTING_READ_RESULT: u16 = 0xC20A;
    pub const SDIO_MEDIA_FORMAT_RESULT: u16 = 0xC20B;
    pub const SDIO_CONTENTS_TRANSFER_EVENT: u16 = 0xC20D;
    pub const SDIO_ZOOM_AND_FOCUS_POSITION_EVENT: u16 = 0xC20E;
    pub const SDIO_AF_STATUS: u16 = 0xC223;
}

/// Object format codes.
pub mod format {
    pub const FOLDER: u16 = 0x3001;
    pub const TEXT: u16 = 0x3004;
    pub const MPEG: u16 = 0x300B;
    pub const JPEG: u16 = 0x3801;
    pub const JFIF: u16 = 0x3808;
    pub const RAW: u16 = 0xB101;
    pub const HEIF: u16 = 0xB110;
    pub const MPO: u16 = 0xB301;
    pub const MP4: u16 = 0xB982;
}

/// Well-known pseudo object handles in the vendor-reserved 0xFFFFC000 band.
pub mod handle {
    pub const CAPTURED_IMAGE: u32 = 0xFFFF_C001;
    pub const LIVE_VIEW_IMAGE: u32 = 0xFFFF_C002;
    pub const CAMERA_SETTINGS: u32 = 0xFFFF_C004;
    pub const FTP_SETTINGS: u32 = 0xFFFF_C005;
}

/// Descriptor form flag: the shape of a property's permissible values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFlag {
    None,
    Range,
    Enum,
}

impl FormFlag {
    pub fn from_code(code: u8) -> Option<FormFlag> {
        match code {
            0x00 => Some(FormFlag::None),
            0x01 => Some(FormFlag::Range),
            0x02 => Some(FormFlag::Enum),
            _ => None,
        }
    }
}

/// The control-type byte of a control descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    /// Press/release pairs (value 2 = down, 1 = up).
    Button,
    /// Signed relative steps.
    Notch,
    /// Absolute values within the declared form.
    Variable,
}

impl ControlType {
    pub fn from_code(code: u8) -> Option<ControlType> {
        match code {
            0x81 => Some(ControlType::Button),
            0x82 => Some(ControlType::Notch),
            0x84 => Some(ControlType::Variable),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ControlType::Button => 0x81,
            ControlType::Notch => 0x82,
            ControlType::Variable => 0x84,
        }
    }
}

/// Sony protocol generation negotiated at connect time. 2020+ bodies speak
/// 300, which carries more properties and absolute setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V200,
    V300,
}

impl ProtocolVersion {
    pub fn as_u16(self) -> u16 {
        match self {
            ProtocolVersion::V200 => 200,
            ProtocolVersion::V300 => 300,
        }
    }
}

/// Hint for the transaction's data phase, ferried verbatim on the escape
/// framing. Wire values come from the Windows WIA service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPhase {
    ReadData = 3,
    WriteData = 4,
    NoData = 5,
}

/// One PTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub op_code: u16,
    pub session_id: u32,
    pub transaction_id: u32,
    pub params: [u32; MAX_PARAMS],
    pub num_params: usize,
    pub next_phase: NextPhase,
}

impl Request {
    pub fn new(op_code: u16, session_id: u32, transaction_id: u32) -> Self {
        Self {
            op_code,
            session_id,
            transaction_id,
            params: [0; MAX_PARAMS],
            num_params: 0,
            next_phase: NextPhase::ReadData,
        }
    }

    pub fn with_params(mut self, params: &[u32]) -> Self {
        self.set_params(params);
        self
    }

    pub fn set_params(&mut self, params: &[u32]) {
        self.num_params = params.len().min(MAX_PARAMS);
        self.params[..self.num_params].copy_from_slice(&params[..self.num_params]);
    }

    pub fn params(&self) -> &[u32] {
        &self.params[..self.num_params]
    }
}

/// One PTP response, filled in by the transport.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub response_code: u16,
    pub session_id: u32,
    pub transaction_id: u32,
    pub params: [u32; MAX_PARAMS],
    pub num_params: usize,
}

impl Response {
    pub fn params(&self) -> &[u32] {
        &self.params[..self.num_params]
    }
}

/// An asynchronous event from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtpEvent {
    pub code: u16,
    pub params: [u32; 3],
    pub num_params: usize,
}

pub const CONTAINER_COMMAND: u16 = 1;
pub const CONTAINER_DATA: u16 = 2;
pub const CONTAINER_RESPONSE: u16 = 3;
pub const CONTAINER_EVENT: u16 = 4;

pub const CONTAINER_HEADER_LEN: usize = 12;

/// The 12-byte container header framing every USB transfer. All fields are
/// little-endian; `length` covers the header itself.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct ContainerHeader {
    #[packed_field(bytes = "0..=3", endian = "lsb")]
    pub length: Integer<u32, packed_bits::Bits<32>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub container_type: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub code: Integer<u16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=11", endian = "lsb")]
    pub transaction_id: Integer<u32, packed_bits::Bits<32>>,
}

impl ContainerHeader {
    pub fn new(length: u32, container_type: u16, code: u16, transaction_id: u32) -> Self {
        Self {
            length: Integer::from_primitive(length),
            container_type: Integer::from_primitive(container_type),
            code: Integer::from_primitive(code),
            transaction_id: Integer::from_primitive(transaction_id),
        }
    }

    /// Serialize into the first 12 bytes of `out`.
    pub fn write_to(&self, out: &mut [u8]) -> Result<()> {
        let packed = self.pack().map_err(|_| Error::MalformedResponse)?;
        let remaining = out.len();
        out.get_mut(..CONTAINER_HEADER_LEN)
            .ok_or(Error::ShortBuffer {
                needed: CONTAINER_HEADER_LEN,
                remaining,
            })?
            .copy_from_slice(&packed);
        Ok(())
    }

    /// Parse from the first 12 bytes of `data`.
    pub fn read_from(data: &[u8]) -> Result<Self> {
        let bytes: &[u8; CONTAINER_HEADER_LEN] = data
            .get(..CONTAINER_HEADER_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::MalformedResponse)?;
        Self::unpack(bytes).map_err(|_| Error::MalformedResponse)
    }
}
