//! Frozen per-code metadata: display names, known value enumerations,
//! value formatters and control seeds. Shared by every session, read-only
//! after process start, no locking.

use crate::ptp::{ctrl, event, format, op, prop, ControlType, FormFlag};
use crate::value::{DataType, Value};

//////////////////////////////////////////////////////////////////////////
// Display names
//////////////////////////////////////////////////////////////////////////

static PROPERTY_NAMES: &[(u16, &str)] = &[
    (prop::COMPRESSION_SETTING, "Compression Setting"),
    (prop::WHITE_BALANCE, "White Balance"),
    (prop::F_NUMBER, "F-Number"),
    (prop::FOCUS_MODE, "Focus Mode"),
    (prop::EXPOSURE_METERING_MODE, "Exposure Metering Mode"),
    (prop::FLASH_MODE, "Flash Mode"),
    (prop::EXPOSURE_PROGRAM_MODE, "Exposure Program Mode"),
    (prop::EXPOSURE_COMPENSATION, "Exposure Bias Compensation"),
    (prop::CAPTURE_MODE, "Capture Mode"),
    (prop::FLASH_COMPENSATION, "Flash Compensation"),
    (prop::DRO_HDR_MODE, "DRO/Auto HDR Mode"),
    (prop::IMAGE_SIZE, "Image Size"),
    (prop::SHUTTER_SPEED, "Shutter Speed"),
    (prop::BATTERY_LEVEL, "Battery Level"),
    (prop::COLOR_TEMPERATURE, "Color Temperature"),
    (prop::WHITE_BALANCE_GM, "White Balance GM"),
    (prop::ASPECT_RATIO, "Aspect Ratio"),
    (prop::AF_STATUS, "Auto Focus Status"),
    (prop::PREDICTED_MAX_FILE_SIZE, "Predicted Maximum File Size"),
    (prop::PENDING_FILES, "Pending Files"),
    (prop::AE_LOCK_STATUS, "AE Lock Status"),
    (prop::BATTERY_REMAINING, "Battery Remaining"),
    (prop::PICTURE_EFFECT, "Picture Effect"),
    (prop::WHITE_BALANCE_AB, "White Balance AB"),
    (prop::MOVIE_REC_STATE, "Movie Recording State"),
    (prop::ISO, "ISO Sensitivity"),
    (prop::FEL_LOCK_STATUS, "FEL Lock Status"),
    (prop::LIVE_VIEW_STATUS, "Live View Status"),
    (prop::IMAGE_SAVE_DESTINATION, "Image Save Destination"),
    (prop::FOCUS_AREA, "Focus Area"),
    (prop::FOCUS_MAGNIFY_SCALE, "Focus Magnify Scale"),
    (prop::FOCUS_MAGNIFY_POS, "Focus Magnify Position"),
    (prop::LIVE_VIEW_SETTING_EFFECT, "Live View Setting Effect"),
    (prop::MANUAL_FOCUS_ADJUST_ENABLED, "Manual Focus Adjust Enabled"),
    (prop::PIXEL_SHIFT_SHOOTING_MODE, "Pixel Shift Shooting Mode"),
    (prop::PIXEL_SHIFT_SHOOTING_NUMBER, "Pixel Shift Shooting Number"),
    (prop::PIXEL_SHIFT_SHOOTING_INTERVAL, "Pixel Shift Shooting Interval"),
    (prop::PIXEL_SHIFT_SHOOTING_STATUS, "Pixel Shift Shooting Status"),
    (prop::PIXEL_SHIFT_SHOOTING_PROGRESS, "Pixel Shift Shooting Progress"),
    (prop::PICTURE_PROFILE, "Picture Profile"),
    (prop::CREATIVE_STYLE, "Creative Style"),
    (prop::MOVIE_FILE_FORMAT, "Movie File Format"),
    (prop::MOVIE_QUALITY, "Movie Quality"),
    (prop::MEDIA_SLOT1_STATUS, "Media Slot 1 Status"),
    (prop::FOCAL_POSITION, "Focal Position"),
    (prop::AWB_LOCK_STATUS, "AWB Lock Status"),
    (prop::INTERVAL_RECORD_MODE, "Interval Record Mode"),
    (prop::INTERVAL_RECORD_STATUS, "Interval Record Status"),
    (prop::DEVICE_OVERHEATING_STATE, "Device Overheating State"),
    (prop::IMAGE_QUALITY, "Image Quality"),
    (prop::IMAGE_FILE_FORMAT, "Image File Format"),
    (prop::FOCUS_MAGNIFY, "Focus Magnify"),
    (prop::AF_TRACKING_SENS, "AF Tracking Sensitivity"),
    (prop::MEDIA_SLOT2_STATUS, "Media Slot 2 Status"),
    (prop::EXPOSURE_MODE_KEY, "Exposure Mode Key"),
    (prop::ZOOM_OPERATION_ENABLED, "Zoom Operation Enabled"),
    (prop::ZOOM_SCALE, "Zoom Scale"),
    (prop::ZOOM_BAR_INFO, "Zoom Bar Info"),
    (prop::ZOOM_SETTING, "Zoom Setting"),
    (prop::ZOOM_TYPE_STATUS, "Zoom Type Status"),
    (prop::WIRELESS_FLASH, "Wireless Flash"),
    (prop::RED_EYE_REDUCTION, "Red Eye Reduction"),
    (prop::REMOTE_RESTRICT_STATUS, "Remote Restrict Status"),
    (prop::IMAGE_TRANSFER_SIZE, "Image Transfer Size"),
    (prop::PC_SAVE_IMAGE, "PC Save Image"),
    (prop::LIVE_VIEW_QUALITY, "Live View Quality"),
    (prop::CAMERA_SETTING_SAVE_ENABLED, "Camera Settings Save Enabled"),
    (prop::CAMERA_SETTING_READ_ENABLED, "Camera Settings Read Enabled"),
    (prop::CAMERA_SETTING_SAVE_READ_STATE, "Camera Settings Save/Read State"),
    (prop::FORMAT_MEDIA_SLOT1_ENABLED, "Format Media Slot 1 Enabled"),
    (prop::FORMAT_MEDIA_SLOT2_ENABLED, "Format Media Slot 2 Enabled"),
    (prop::FORMAT_MEDIA_PROGRESS, "Format Media Progress"),
    (prop::TOUCH_OPERATION_FUNCTION, "Touch Operation Function"),
    (prop::REMOTE_TOUCH_ENABLED, "Remote Touch Enabled"),
    (prop::REMOTE_TOUCH_CANCEL_ENABLED, "Remote Touch Cancel Enabled"),
    (prop::MOVIE_FRAME_RATE, "Movie Frame Rate"),
    (prop::COMPRESSED_IMAGE_FILE_FORMAT, "Compressed Image File Format"),
    (prop::RAW_FILE_TYPE, "RAW File Type"),
    (prop::CONTENTS_TRANSFER_ENABLED, "Contents Transfer Enabled"),
    (prop::LENS_INFORMATION_ENABLED, "Lens Information Enabled"),
];

static CONTROL_NAMES: &[(u16, &str)] = &[
    (ctrl::S1_BUTTON, "Shutter Half-Press Button"),
    (ctrl::S2_BUTTON, "Shutter Release Button"),
    (ctrl::AE_LOCK, "AEL Button"),
    (ctrl::AFL_BUTTON, "AFL Button"),
    (ctrl::RELEASE_LOCK, "Release Lock"),
    (ctrl::REQUEST_ONE_SHOOTING, "Request One Shooting"),
    (ctrl::MOVIE_RECORD, "Movie Record Button"),
    (ctrl::FEL_BUTTON, "FEL Button"),
    (ctrl::MEDIA_FORMAT, "Format Media"),
    (ctrl::FOCUS_MAGNIFIER, "Focus Magnifier"),
    (ctrl::FOCUS_MAGNIFIER_CANCEL, "Focus Magnifier Cancel"),
    (ctrl::REMOTE_KEY_UP, "Focus Magnifier Up"),
    (ctrl::REMOTE_KEY_DOWN, "Focus Magnifier Down"),
    (ctrl::REMOTE_KEY_LEFT, "Focus Magnifier Left"),
    (ctrl::REMOTE_KEY_RIGHT, "Focus Magnifier Right"),
    (ctrl::MANUAL_FOCUS_ADJUST, "Manual Focus Adjust"),
    (ctrl::AUTO_FOCUS_HOLD, "Autofocus Hold"),
    (ctrl::PIXEL_SHIFT_SHOOT_CANCEL, "Pixel Shift Shooting Cancel"),
    (ctrl::PIXEL_SHIFT_SHOOT, "Pixel Shift Shooting Mode"),
    (ctrl::HFR_STANDBY, "HFR Standby"),
    (ctrl::HFR_RECORD_CANCEL, "HFR Record Cancel"),
    (ctrl::FOCUS_STEP_NEAR, "Focus Step Near"),
    (ctrl::FOCUS_STEP_FAR, "Focus Step Far"),
    (ctrl::AWB_LOCK, "AWBL Button"),
    (ctrl::FOCUS_AREA_XY, "AF Area Position (x, y)"),
    (ctrl::ZOOM, "Zoom Operation"),
    (ctrl::CUSTOM_WB_CAPTURE_STANDBY, "Custom WB Capture Standby"),
    (ctrl::CUSTOM_WB_CAPTURE_STANDBY_CANCEL, "Custom WB Capture Standby Cancel"),
    (ctrl::CUSTOM_WB_CAPTURE, "Custom WB Capture"),
    (ctrl::FORMAT_MEDIA, "Format Media"),
    (ctrl::REMOTE_TOUCH_XY, "Remote Touch (x, y)"),
    (ctrl::REMOTE_TOUCH_CANCEL, "Remote Touch Cancel"),
    (ctrl::S1_AND_S2_BUTTON, "S1 & S2 Button"),
    (ctrl::FORMAT_MEDIA_CANCEL, "Format Media Cancel"),
    (ctrl::SAVE_ZOOM_AND_FOCUS_POSITION, "Save Zoom and Focus Position"),
    (ctrl::LOAD_ZOOM_AND_FOCUS_POSITION, "Load Zoom and Focus Position"),
    (ctrl::APS_C_FULL_TOGGLE, "APS-C / Full Toggle"),
    (ctrl::COLOR_TEMPERATURE_STEP, "Color Temperature Step"),
    (ctrl::WHITE_BALANCE_TINT_STEP, "White Balance Tint Step"),
    (ctrl::FOCUS_OPERATION, "Focus Operation"),
    (ctrl::FLICKER_SCAN, "Flicker Scan"),
    (ctrl::SETTINGS_RESET, "Settings Reset"),
    (ctrl::PIXEL_MAPPING, "Pixel Mapping"),
    (ctrl::POWER_OFF, "Power Off"),
    (ctrl::TIME_CODE_PRESET_RESET, "Time Code Preset Reset"),
    (ctrl::USER_BIT_PRESET_RESET, "User Bit Preset Reset"),
    (ctrl::SENSOR_CLEANING, "Sensor Cleaning"),
    (ctrl::RESET_PICTURE_PROFILE, "Reset Picture Profile"),
    (ctrl::RESET_CREATIVE_LOOK, "Reset Creative Look"),
    (ctrl::SHUTTER_ECS_NUMBER_STEP, "Shutter ECS Number Step"),
    (ctrl::MOVIE_RECORD_TOGGLE, "Movie Record Toggle"),
    (ctrl::FOCUS_POSITION_CANCEL, "Focus Position Cancel"),
];

static EVENT_NAMES: &[(u16, &str)] = &[
    (event::STORE_ADDED, "StoreAdded"),
    (event::STORE_REMOVED, "StoreRemoved"),
    (event::SDIO_OBJECT_ADDED, "ObjectAdded"),
    (event::SDIO_OBJECT_REMOVED, "ObjectRemoved"),
    (event::SDIO_DEVICE_PROP_CHANGED, "DevicePropChanged"),
    (event::SDIO_DATE_TIME_SETTING_RESULT, "DateTimeSettingResult"),
    (event::SDIO_CAPTURED_EVENT, "CapturedEvent"),
    (event::SDIO_CWB_CAPTURED_RESULT, "CWBCapturedResult"),
    (event::SDIO_CAMERA_SETTING_READ_RESULT, "CameraSettingReadResult"),
    (event::SDIO_FTP_SETTING_READ_RESULT, "FTPSettingReadResult"),
    (event::SDIO_MEDIA_FORMAT_RESULT, "MediaFormatResult"),
    (event::SDIO_CONTENTS_TRANSFER_EVENT, "ContentsTransferEvent"),
    (event::SDIO_ZOOM_AND_FOCUS_POSITION_EVENT, "ZoomAndFocusPositionEvent"),
    (event::SDIO_AF_STATUS, "AFStatus"),
];

static OPERATION_NAMES: &[(u16, &str)] = &[
    (op::GET_DEVICE_INFO, "GetDeviceInfo"),
    (op::OPEN_SESSION, "OpenSession"),
    (op::CLOSE_SESSION, "CloseSession"),
    (op::GET_STORAGE_IDS, "GetStorageIDs"),
    (op::GET_STORAGE_INFO, "GetStorageInfo"),
    (op::GET_NUM_OBJECTS, "GetNumObjects"),
    (op::GET_OBJECT_HANDLES, "GetObjectHandles"),
    (op::GET_OBJECT_INFO, "GetObjectInfo"),
    (op::GET_OBJECT, "GetObject"),
    (op::GET_THUMB, "GetThumb"),
    (op::DELETE_OBJECT, "DeleteObject"),
    (op::SEND_OBJECT, "SendObject"),
    (op::SDIO_CONNECT, "SDIO_Connect"),
    (op::SDIO_GET_EXT_DEVICE_INFO, "SDIO_GetExtDeviceInfo"),
    (op::SDIO_SET_EXT_DEVICE_PROP_VALUE, "SDIO_SetExtDevicePropValue"),
    (op::SDIO_CONTROL_DEVICE, "SDIO_ControlDevice"),
    (op::SDIO_GET_ALL_EXT_DEVICE_PROP_INFO, "SDIO_GetAllExtDevicePropInfo"),
    (op::SDIO_SET_FTP_SETTING_FILE_PASSWORD, "SDIO_SetFTPSettingFilePassword"),
    (op::SDIO_OPEN_SESSION, "SDIO_OpenSession"),
    (op::SDIO_GET_PARTIAL_LARGE_OBJECT, "SDIO_GetPartialLargeObject"),
    (op::SDIO_SET_CONTENTS_TRANSFER_MODE, "SDIO_SetContentsTransferMode"),
    (op::SDIO_GET_DISPLAY_STRING_LIST, "SDIO_GetDisplayStringList"),
    (op::SDIO_GET_LENS_INFORMATION, "SDIO_GetLensInformation"),
];

static OBJECT_FORMAT_NAMES: &[(u16, &str)] = &[
    (format::FOLDER, "Folder"),
    (format::TEXT, "Text"),
    (format::MPEG, "MPEG"),
    (format::JPEG, "JPEG"),
    (format::JFIF, "JFIF"),
    (format::RAW, "ARW"),
    (format::HEIF, "HEIF"),
    (format::MPO, "MPO"),
    (format::MP4, "MP4"),
];

fn lookup(table: &'static [(u16, &'static str)], code: u16) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

pub fn property_name(code: u16) -> Option<&'static str> {
    lookup(PROPERTY_NAMES, code)
}

pub fn control_name(code: u16) -> Option<&'static str> {
    lookup(CONTROL_NAMES, code)
}

pub fn event_name(code: u16) -> Option<&'static str> {
    lookup(EVENT_NAMES, code)
}

pub fn operation_name(code: u16) -> Option<&'static str> {
    lookup(OPERATION_NAMES, code)
}

pub fn object_format_name(code: u16) -> Option<&'static str> {
    lookup(OBJECT_FORMAT_NAMES, code)
}

pub fn data_type_name(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Undef => "UNDEF",
        DataType::I8 => "INT8",
        DataType::U8 => "UINT8",
        DataType::I16 => "INT16",
        DataType::U16 => "UINT16",
        DataType::I32 => "INT32",
        DataType::U32 => "UINT32",
        DataType::I64 => "INT64",
        DataType::U64 => "UINT64",
        DataType::I128 => "INT128",
        DataType::U128 => "UINT128",
        DataType::AI8 => "AINT8",
        DataType::AU8 => "AUINT8",
        DataType::AI16 => "AINT16",
        DataType::AU16 => "AUINT16",
        DataType::AI32 => "AINT32",
        DataType::AU32 => "AUINT32",
        DataType::AI64 => "AINT64",
        DataType::AU64 => "AUINT64",
        DataType::AI128 => "AINT128",
        DataType::AU128 => "AUINT128",
        DataType::Str => "STR",
    }
}

pub fn form_flag_name(form_flag: FormFlag) -> &'static str {
    match form_flag {
        FormFlag::None => "None",
        FormFlag::Range => "Range",
        FormFlag::Enum => "Enum",
    }
}

pub fn enabled_state_name(is_enabled: u8) -> &'static str {
    match is_enabled {
        0 => "Disabled",
        1 => "Enabled",
        2 => "Display Only",
        _ => "Unknown",
    }
}

//////////////////////////////////////////////////////////////////////////
// Notch properties
//////////////////////////////////////////////////////////////////////////

/// Properties that pre-2020 cameras only adjust by signed relative step
/// through the control path.
pub(crate) const NOTCH_PROPERTIES: &[u16] = &[
    prop::F_NUMBER,
    prop::EXPOSURE_COMPENSATION,
    prop::FLASH_COMPENSATION,
    prop::SHUTTER_SPEED,
    prop::ISO,
];

pub(crate) fn is_notch_code(code: u16) -> bool {
    NOTCH_PROPERTIES.contains(&code)
}

//////////////////////////////////////////////////////////////////////////
// Known value enumerations
//////////////////////////////////////////////////////////////////////////

pub(crate) type Labels = &'static [(u32, &'static str)];

static ON_OFF0: Labels = &[(0x00, "Off"), (0x01, "On")];
static ON_OFF1: Labels = &[(0x01, "Off"), (0x02, "On")];
static ENABLED_DISABLED: Labels = &[(0x00, "Disabled"), (0x01, "Enabled")];
static LOCKED_UNLOCKED: Labels = &[(0x01, "Unlocked"), (0x02, "Locked")];

static WHITE_BALANCE: Labels = &[
    (0x0002, "Auto"),
    (0x0004, "Daylight"),
    (0x0006, "Incandescent"),
    (0x0007, "Flash"),
    (0x8001, "Fluorescent (Warm White)"),
    (0x8002, "Fluorescent (Cool White)"),
    (0x8003, "Fluorescent (Day White)"),
    (0x8004, "Fluorescent (Daylight)"),
    (0x8010, "Cloudy"),
    (0x8011, "Shade"),
    (0x8012, "Color Temperature / Filter"),
    (0x8020, "Custom 1"),
    (0x8021, "Custom 2"),
    (0x8022, "Custom 3"),
    (0x8030, "Underwater Auto"),
];

static FOCUS_MODE: Labels = &[
    (0x0001, "MF"),
    (0x0002, "AF-S"),
    (0x8004, "AF-C"),
    (0x8005, "AF-A"),
    (0x8006, "DMF"),
];

static FOCUS_AREA: Labels = &[
    (0x0001, "Wide"),
    (0x0002, "Zone"),
    (0x0003, "Center"),
    (0x0101, "Flexible Spot S"),
    (0x0102, "Flexible Spot M"),
    (0x0103, "Flexible Spot L"),
    (0x0104, "Expand Flexible Spot"),
    (0x0105, "Flexible Spot"),
    (0x0201, "Tracking: Wide"),
    (0x0202, "Tracking: Zone"),
    (0x0203, "Tracking: Center"),
    (0x0204, "Tracking: Flexible Spot S"),
    (0x0205, "Tracking: Flexible Spot M"),
    (0x0206, "Tracking: Flexible Spot L"),
    (0x0207, "Tracking: Expand Flexible Spot"),
    (0x0208, "Tracking: Flexible Spot"),
];

static EXPOSURE_PROGRAM: Labels = &[
    (0x0001, "Manual"),
    (0x0002, "Program Auto"),
    (0x0003, "Aperture Priority"),
    (0x0004, "Shutter Priority"),
    (0x8000, "Intelligent Auto"),
    (0x8001, "Superior Auto"),
    (0x8050, "Movie (Program Auto)"),
    (0x8051, "Movie (Aperture Priority)"),
    (0x8052, "Movie (Shutter Priority)"),
    (0x8053, "Movie (Manual)"),
    (0x8080, "S&Q (Program Auto)"),
    (0x8081, "S&Q (Aperture Priority)"),
    (0x8082, "S&Q (Shutter Priority)"),
    (0x8083, "S&Q (Manual)"),
];

static METERING_MODE: Labels = &[
    (0x0001, "Average"),
    (0x0002, "Center Weighted Average"),
    (0x0003, "Multi Spot"),
    (0x0004, "Center Spot"),
    (0x8001, "Multi"),
    (0x8002, "Center"),
    (0x8003, "Spot (Standard)"),
    (0x8004, "Spot (Large)"),
    (0x8005, "Entire Screen Average"),
    (0x8006, "Highlight"),
];

static FLASH_MODE: Labels = &[
    (0x0001, "Auto Flash"),
    (0x0002, "Flash Off"),
    (0x0003, "Fill Flash"),
    (0x0004, "Red Eye Auto"),
    (0x0005, "Red Eye Fill"),
    (0x8001, "Slow Sync"),
    (0x8003, "Rear Sync"),
    (0x8032, "Wireless Sync"),
];

static DRO_HDR: Labels = &[
    (0x0001, "Off"),
    (0x001F, "DRO Auto"),
    (0x0011, "DRO Lv1"),
    (0x0012, "DRO Lv2"),
    (0x0013, "DRO Lv3"),
    (0x0014, "DRO Lv4"),
    (0x0015, "DRO Lv5"),
    (0x0020, "Auto HDR 1.0EV"),
    (0x0021, "Auto HDR 2.0EV"),
    (0x0022, "Auto HDR 3.0EV"),
    (0x0023, "Auto HDR 4.0EV"),
    (0x0024, "Auto HDR 5.0EV"),
    (0x0025, "Auto HDR 6.0EV"),
    (0x003F, "Auto HDR Auto"),
];

static COMPRESSION: Labels = &[
    (0x02, "Standard"),
    (0x03, "Fine"),
    (0x04, "Extra Fine"),
    (0x05, "Light"),
    (0x10, "RAW"),
    (0x12, "RAW & JPEG"),
    (0x13, "RAW & HEIF"),
];

static IMAGE_SIZE: Labels = &[(0x01, "Large"), (0x02, "Medium"), (0x03, "Small")];

static ASPECT_RATIO: Labels = &[
    (0x01, "3:2"),
    (0x02, "16:9"),
    (0x03, "4:3"),
    (0x04, "1:1"),
];

static CAPTURE_MODE: Labels = &[
    (0x0001, "Single Shooting"),
    (0x8012, "Continuous Shooting Lo"),
    (0x8013, "Continuous Shooting Hi"),
    (0x8014, "Continuous Shooting Hi+"),
    (0x8015, "Continuous Shooting Mid"),
    (0x8005, "Self-timer 10s"),
    (0x8004, "Self-timer 5s"),
    (0x8003, "Self-timer 2s"),
    (0x8337, "Bracket 0.3EV 3 Image"),
    (0x8537, "Bracket 0.5EV 3 Image"),
    (0x8737, "Bracket 0.7EV 3 Image"),
    (0x8937, "Bracket 1.0EV 3 Image"),
    (0x8018, "White Balance Bracket Lo"),
    (0x8028, "White Balance Bracket Hi"),
    (0x8019, "DRO Bracket Lo"),
    (0x8029, "DRO Bracket Hi"),
];

static AF_STATUS: Labels = &[
    (0x01, "Unlocked"),
    (0x02, "Focused (AF-S)"),
    (0x03, "Not Focused"),
    (0x05, "Focused (AF-C)"),
    (0x06, "Focusing"),
];

static MEDIA_SLOT_STATUS: Labels = &[
    (0x01, "OK"),
    (0x02, "No Media"),
    (0x03, "Media Error"),
    (0x04, "Recognizing"),
];

static MOVIE_REC_STATE: Labels = &[
    (0x00, "Not Recording"),
    (0x01, "Recording"),
    (0x02, "Recording Stopping"),
];

static SAVE_DESTINATION: Labels = &[
    (0x0001, "Camera"),
    (0x0010, "PC"),
    (0x0011, "Camera & PC"),
];

static PC_SAVE_IMAGE_SIZE: Labels = &[(0x01, "Original"), (0x02, "2M")];

static TRANSFER_SIZE: Labels = &[(0x00, "Original"), (0x01, "Small Size")];

static LIVE_VIEW_QUALITY: Labels = &[(0x01, "Low"), (0x02, "High")];

static LIVE_VIEW_SETTING_EFFECT: Labels = &[(0x01, "On"), (0x02, "Off")];

static ZOOM_SETTING: Labels = &[
    (0x01, "Optical Zoom Only"),
    (0x02, "Smart Zoom Only"),
    (0x03, "ClearImage Zoom"),
    (0x04, "Digital Zoom"),
];

static RAW_FILE_TYPE: Labels = &[
    (0x01, "Compressed"),
    (0x02, "Lossless Compressed"),
    (0x03, "Uncompressed"),
];

static IMAGE_QUALITY: Labels = &[
    (0x01, "Light"),
    (0x02, "Standard"),
    (0x03, "Fine"),
    (0x04, "Extra Fine"),
];

static AF_TRACKING_SENS: Labels = &[
    (0x01, "1 (Locked On)"),
    (0x02, "2"),
    (0x03, "3 (Standard)"),
    (0x04, "4"),
    (0x05, "5 (Responsive)"),
];

static OVERHEATING_STATE: Labels = &[
    (0x00, "Normal"),
    (0x01, "Pre-Overheating"),
    (0x02, "Overheating"),
];

static INTERVAL_REC_STATUS: Labels = &[
    (0x01, "Waiting"),
    (0x02, "Shooting"),
    (0x03, "Stopping"),
];

static PIXEL_SHIFT_MODE: Labels = &[(0x00, "Off"), (0x01, "On")];

static PIXEL_SHIFT_STATUS: Labels = &[
    (0x00, "None"),
    (0x01, "Standby"),
    (0x02, "Shooting"),
];

//////////////////////////////////////////////////////////////////////////
// Per-code display metadata
//////////////////////////////////////////////////////////////////////////

pub(crate) enum DisplayKind {
    /// Fixed enumeration, matched exactly on the raw value.
    Labels(Labels),
    /// Composite value rendered by a format function.
    Format(fn(&Value) -> Option<String>),
}

pub(crate) struct PropertyDisplay {
    pub code: u16,
    pub data_type: DataType,
    pub kind: DisplayKind,
}

macro_rules! labels {
    ($code:expr, $dt:ident, $table:expr) => {
        PropertyDisplay {
            code: $code,
            data_type: DataType::$dt,
            kind: DisplayKind::Labels($table),
        }
    };
}

macro_rules! formatted {
    ($code:expr, $dt:ident, $func:expr) => {
        PropertyDisplay {
            code: $code,
            data_type: DataType::$dt,
            kind: DisplayKind::Format($func),
        }
    };
}

pub(crate) static PROPERTY_DISPLAY: &[PropertyDisplay] = &[
    labels!(prop::COMPRESSION_SETTING, U8, COMPRESSION),
    labels!(prop::IMAGE_FILE_FORMAT, U8, COMPRESSION),
    labels!(prop::RAW_FILE_TYPE, U8, RAW_FILE_TYPE),
    labels!(prop::COMPRESSED_IMAGE_FILE_FORMAT, U8, COMPRESSION),
    labels!(prop::IMAGE_QUALITY, U8, IMAGE_QUALITY),
    labels!(prop::IMAGE_SIZE, U8, IMAGE_SIZE),
    labels!(prop::IMAGE_SAVE_DESTINATION, U16, SAVE_DESTINATION),
    labels!(prop::PC_SAVE_IMAGE, U8, PC_SAVE_IMAGE_SIZE),
    labels!(prop::IMAGE_TRANSFER_SIZE, U8, TRANSFER_SIZE),
    labels!(prop::EXPOSURE_PROGRAM_MODE, U16, EXPOSURE_PROGRAM),
    labels!(prop::EXPOSURE_PROGRAM_MODE, U32, EXPOSURE_PROGRAM),
    labels!(prop::EXPOSURE_MODE_KEY, U8, EXPOSURE_PROGRAM),
    labels!(prop::CAPTURE_MODE, U16, CAPTURE_MODE),
    labels!(prop::CAPTURE_MODE, U32, CAPTURE_MODE),
    formatted!(prop::F_NUMBER, U16, format_f_number),
    formatted!(prop::SHUTTER_SPEED, U32, format_shutter_speed),
    formatted!(prop::ISO, U32, format_iso),
    labels!(prop::ASPECT_RATIO, U8, ASPECT_RATIO),
    labels!(prop::WHITE_BALANCE, U16, WHITE_BALANCE),
    formatted!(prop::COLOR_TEMPERATURE, U16, format_color_temperature),
    formatted!(prop::WHITE_BALANCE_GM, U8, format_white_balance_gm),
    formatted!(prop::WHITE_BALANCE_AB, U8, format_white_balance_ab),
    labels!(prop::EXPOSURE_METERING_MODE, U16, METERING_MODE),
    formatted!(prop::EXPOSURE_COMPENSATION, I16, format_exposure_bias),
    labels!(prop::DRO_HDR_MODE, U16, DRO_HDR),
    labels!(prop::AWB_LOCK_STATUS, U8, LOCKED_UNLOCKED),
    labels!(prop::FEL_LOCK_STATUS, U8, LOCKED_UNLOCKED),
    labels!(prop::AE_LOCK_STATUS, U8, LOCKED_UNLOCKED),
    labels!(prop::FOCUS_MODE, U16, FOCUS_MODE),
    labels!(prop::FOCUS_AREA, U16, FOCUS_AREA),
    labels!(prop::MANUAL_FOCUS_ADJUST_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::AF_TRACKING_SENS, U8, AF_TRACKING_SENS),
    labels!(prop::AF_STATUS, U8, AF_STATUS),
    labels!(prop::FLASH_MODE, U16, FLASH_MODE),
    labels!(prop::WIRELESS_FLASH, U8, ON_OFF0),
    labels!(prop::RED_EYE_REDUCTION, U8, ON_OFF0),
    formatted!(prop::FLASH_COMPENSATION, I16, format_exposure_bias),
    labels!(prop::MOVIE_REC_STATE, U8, MOVIE_REC_STATE),
    labels!(prop::INTERVAL_RECORD_MODE, U8, ON_OFF1),
    labels!(prop::INTERVAL_RECORD_STATUS, U8, INTERVAL_REC_STATUS),
    labels!(prop::MEDIA_SLOT1_STATUS, U8, MEDIA_SLOT_STATUS),
    labels!(prop::MEDIA_SLOT2_STATUS, U8, MEDIA_SLOT_STATUS),
    labels!(prop::FORMAT_MEDIA_SLOT1_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::FORMAT_MEDIA_SLOT2_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::CONTENTS_TRANSFER_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::LIVE_VIEW_QUALITY, U8, LIVE_VIEW_QUALITY),
    labels!(prop::LIVE_VIEW_STATUS, U8, ENABLED_DISABLED),
    labels!(prop::LIVE_VIEW_SETTING_EFFECT, U8, LIVE_VIEW_SETTING_EFFECT),
    formatted!(prop::BATTERY_REMAINING, I8, format_battery_remaining),
    labels!(prop::DEVICE_OVERHEATING_STATE, U8, OVERHEATING_STATE),
    labels!(prop::REMOTE_TOUCH_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::REMOTE_TOUCH_CANCEL_ENABLED, U8, ENABLED_DISABLED),
    formatted!(prop::PREDICTED_MAX_FILE_SIZE, U32, format_predicted_max_file_size),
    formatted!(prop::PENDING_FILES, U16, format_pending_files),
    labels!(prop::PIXEL_SHIFT_SHOOTING_MODE, U8, PIXEL_SHIFT_MODE),
    formatted!(prop::PIXEL_SHIFT_SHOOTING_NUMBER, U16, format_pixel_shift_number),
    formatted!(prop::PIXEL_SHIFT_SHOOTING_INTERVAL, U16, format_pixel_shift_interval),
    labels!(prop::PIXEL_SHIFT_SHOOTING_STATUS, U8, PIXEL_SHIFT_STATUS),
    formatted!(prop::PIXEL_SHIFT_SHOOTING_PROGRESS, U16, format_pixel_shift_progress),
    labels!(prop::ZOOM_OPERATION_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::ZOOM_SETTING, U8, ZOOM_SETTING),
    labels!(prop::ZOOM_TYPE_STATUS, U8, ZOOM_SETTING),
    formatted!(prop::ZOOM_SCALE, U32, format_zoom_scale),
    formatted!(prop::ZOOM_BAR_INFO, U32, format_zoom_bar),
    labels!(prop::REMOTE_RESTRICT_STATUS, U8, ENABLED_DISABLED),
    labels!(prop::LENS_INFORMATION_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::CAMERA_SETTING_SAVE_ENABLED, U8, ENABLED_DISABLED),
    labels!(prop::CAMERA_SETTING_READ_ENABLED, U8, ENABLED_DISABLED),
];

pub(crate) fn display_for(code: u16, data_type: DataType) -> Option<&'static PropertyDisplay> {
    PROPERTY_DISPLAY
        .iter()
        .find(|d| d.code == code && d.data_type == data_type)
}

pub(crate) fn label_for(labels: Labels, raw: u32) -> Option<&'static str> {
    labels.iter().find(|(v, _)| *v == raw).map(|(_, s)| *s)
}

//////////////////////////////////////////////////////////////////////////
// Value formatters
//////////////////////////////////////////////////////////////////////////

pub(crate) fn format_f_number(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    match v {
        0xFFFD => Some("Iris Close".to_string()),
        0xFFFE => Some("--".to_string()), // no lens or no lens info
        0xFFFF => Some(String::new()),
        _ => {
            let whole = v / 100;
            let decimals = (v % 100) / 10;
            if whole >= 10 && decimals == 0 {
                Some(format!("{whole}"))
            } else {
                Some(format!("{whole}.{decimals}"))
            }
        }
    }
}

/// Shutter speed packs numerator and denominator into one u32; 30/10 style
/// fractions render as whole seconds.
pub(crate) fn format_shutter_speed(value: &Value) -> Option<String> {
    let Value::U32(v) = *value else { return None };
    if v == 0xFFFF_FFFF {
        return Some("n/a".to_string());
    }
    if v == 0 {
        return Some("Bulb".to_string());
    }
    let top = (v >> 16) as u16;
    let bottom = (v & 0xFFFF) as u16;
    if bottom == 10 && top != 1 {
        let whole = top / 10;
        let decimal = top % 10;
        if decimal != 0 {
            Some(format!("{whole}.{decimal}"))
        } else {
            Some(format!("{whole}"))
        }
    } else {
        Some(format!("{top}/{bottom}"))
    }
}

/// The ISO word carries a mode in the high byte and the sensitivity in the
/// low 24 bits; 0xFFFFFF means Auto.
pub(crate) fn format_iso(value: &Value) -> Option<String> {
    let Value::U32(v) = *value else { return None };
    let mode = v >> 24;
    let iso = v & 0x00FF_FFFF;
    let auto = iso == 0x00FF_FFFF;
    match mode {
        0x00 | 0x10 => Some(if auto {
            "Auto".to_string()
        } else {
            format!("{iso}")
        }),
        0x01 => Some(if auto {
            "Multi-Frame NR Auto".to_string()
        } else {
            format!("Multi-Frame NR {iso}")
        }),
        0x02 => Some(if auto {
            "Multi-Frame NR High Auto".to_string()
        } else {
            format!("Multi-Frame NR High {iso}")
        }),
        _ => None,
    }
}

pub(crate) fn format_exposure_bias(value: &Value) -> Option<String> {
    let Value::I16(v) = *value else { return None };
    let whole = v / 1000;
    let decimal = ((v % 1000) / 100).abs();
    let sign = if v < 0 && whole == 0 { "-" } else { "" };
    Some(format!("{sign}{whole}.{decimal}EV"))
}

fn format_white_balance_bias(value: &Value, positive: char, negative: char) -> Option<String> {
    let Value::U8(raw) = *value else { return None };
    if !(0x9C..=0xE4).contains(&raw) {
        return None;
    }
    let mut offset = raw as i32 - 0xC0;
    if offset == 0 {
        return Some("0.0".to_string());
    }
    let letter = if offset > 0 {
        positive
    } else {
        offset = -offset;
        negative
    };
    let whole = (offset & 0xFC) >> 2;
    let quarter = match offset & 0x03 {
        1 => "25",
        2 => "5",
        3 => "75",
        _ => "0",
    };
    Some(format!("{letter}{whole}.{quarter}"))
}

pub(crate) fn format_white_balance_gm(value: &Value) -> Option<String> {
    format_white_balance_bias(value, 'G', 'M')
}

pub(crate) fn format_white_balance_ab(value: &Value) -> Option<String> {
    format_white_balance_bias(value, 'A', 'B')
}

pub(crate) fn format_color_temperature(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    match v {
        0x0000 => Some("N/A".to_string()),
        0xFFFF => Some(">9900K".to_string()),
        _ => Some(format!("{v}K")),
    }
}

/// Low 15 bits count the files; bit 15 hints more are coming.
pub(crate) fn format_pending_files(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    if v == 0 {
        Some("None".to_string())
    } else {
        Some(format!("Files ({})", v & 0x7FFF))
    }
}

pub(crate) fn format_battery_remaining(value: &Value) -> Option<String> {
    let Value::I8(v) = *value else { return None };
    if v == -1 {
        Some("n/a".to_string())
    } else {
        Some(format!("{v}%"))
    }
}

pub(crate) fn format_predicted_max_file_size(value: &Value) -> Option<String> {
    let Value::U32(v) = *value else { return None };
    Some(format!("{v} bytes"))
}

pub(crate) fn format_pixel_shift_number(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    match v {
        0 => Some("None".to_string()),
        1 => Some("1 Sheet".to_string()),
        _ => Some(format!("{v} Sheets")),
    }
}

pub(crate) fn format_pixel_shift_interval(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    if v == 0xFFFF {
        Some("Shortest Interval".to_string())
    } else {
        Some(format!("{} sec", v & 0x7FFF))
    }
}

pub(crate) fn format_pixel_shift_progress(value: &Value) -> Option<String> {
    let Value::U16(v) = *value else { return None };
    Some(format!("Shot {}", v & 0x7FFF))
}

pub(crate) fn format_zoom_scale(value: &Value) -> Option<String> {
    let Value::U32(v) = *value else { return None };
    let whole = v / 1000;
    let decimal = (v % 1000) / 100;
    if decimal != 0 {
        Some(format!("{whole}.{decimal}"))
    } else {
        Some(format!("{whole}"))
    }
}

pub(crate) fn format_zoom_bar(value: &Value) -> Option<String> {
    let Value::U32(v) = *value else { return None };
    let position = v & 0xFFFF;
    let current_box = (v >> 16) & 0xFF;
    let total_box = (v >> 24) & 0xFF;
    Some(format!("{total_box}, {current_box}, {position}"))
}

//////////////////////////////////////////////////////////////////////////
// Control seeds
//////////////////////////////////////////////////////////////////////////

/// Button controls take 1 = up, 2 = down.
static CONTROL_UP_DOWN: Labels = &[(0x0001, "Up"), (0x0002, "Down")];

static CONTROL_MEDIA_FORMAT: Labels = &[
    (0x0001, "Full Format - Slot 1"),
    (0x0002, "Full Format - Slot 2"),
    (0x0011, "Quick Format - Slot 1"),
    (0x0012, "Quick Format - Slot 2"),
];

pub(crate) enum ControlFormSeed {
    Values(Labels),
    Range { min: i64, max: i64, step: i64 },
    None,
}

pub(crate) struct ControlSeed {
    pub code: u16,
    pub data_type: DataType,
    pub control_type: ControlType,
    pub name: &'static str,
    pub form: ControlFormSeed,
}

macro_rules! button {
    ($code:expr, $name:expr) => {
        ControlSeed {
            code: $code,
            data_type: DataType::U16,
            control_type: ControlType::Button,
            name: $name,
            form: ControlFormSeed::Values(CONTROL_UP_DOWN),
        }
    };
}

macro_rules! notch {
    ($code:expr, $dt:ident, $name:expr, $min:expr, $max:expr) => {
        ControlSeed {
            code: $code,
            data_type: DataType::$dt,
            control_type: ControlType::Notch,
            name: $name,
            form: ControlFormSeed::Range {
                min: $min,
                max: $max,
                step: 1,
            },
        }
    };
}

pub(crate) static CONTROL_SEEDS: &[ControlSeed] = &[
    button!(ctrl::S1_BUTTON, "Shutter Half-Press Button"),
    button!(ctrl::S2_BUTTON, "Shutter Release Button"),
    button!(ctrl::AE_LOCK, "AEL Button"),
    button!(ctrl::AFL_BUTTON, "AFL Button"),
    button!(ctrl::RELEASE_LOCK, "Release Lock"),
    button!(ctrl::REQUEST_ONE_SHOOTING, "Request One Shooting"),
    button!(ctrl::MOVIE_RECORD, "Movie Record Button"),
    button!(ctrl::FEL_BUTTON, "FEL Button"),
    button!(ctrl::MEDIA_FORMAT, "Format Media"),
    button!(ctrl::FOCUS_MAGNIFIER, "Focus Magnifier"),
    button!(ctrl::FOCUS_MAGNIFIER_CANCEL, "Focus Magnifier Cancel"),
    button!(ctrl::REMOTE_KEY_UP, "Focus Magnifier Up"),
    button!(ctrl::REMOTE_KEY_DOWN, "Focus Magnifier Down"),
    button!(ctrl::REMOTE_KEY_LEFT, "Focus Magnifier Left"),
    button!(ctrl::REMOTE_KEY_RIGHT, "Focus Magnifier Right"),
    notch!(ctrl::MANUAL_FOCUS_ADJUST, I16, "Manual Focus Adjust", -7, 7),
    button!(ctrl::AUTO_FOCUS_HOLD, "Autofocus Hold"),
    button!(ctrl::PIXEL_SHIFT_SHOOT_CANCEL, "Pixel Shift Shooting Cancel"),
    button!(ctrl::PIXEL_SHIFT_SHOOT, "Pixel Shift Shooting Mode"),
    button!(ctrl::HFR_STANDBY, "HFR Standby"),
    button!(ctrl::HFR_RECORD_CANCEL, "HFR Record Cancel"),
    button!(ctrl::FOCUS_STEP_NEAR, "Focus Step Near"),
    button!(ctrl::FOCUS_STEP_FAR, "Focus Step Far"),
    button!(ctrl::AWB_LOCK, "AWBL Button"),
    notch!(ctrl::FOCUS_AREA_XY, U32, "AF Area Position (x, y)", 0, 0xFFFF_FFFF),
    ControlSeed {
        code: ctrl::ZOOM,
        data_type: DataType::I8,
        control_type: ControlType::Variable,
        name: "Zoom Operation",
        form: ControlFormSeed::Range {
            min: -1,
            max: 1,
            step: 1,
        },
    },
    button!(ctrl::CUSTOM_WB_CAPTURE_STANDBY, "Custom WB Capture Standby"),
    button!(ctrl::CUSTOM_WB_CAPTURE_STANDBY_CANCEL, "Custom WB Capture Standby Cancel"),
    notch!(ctrl::CUSTOM_WB_CAPTURE, U32, "Custom WB Capture", 0, 0xFFFF_FFFF),
    ControlSeed {
        code: ctrl::FORMAT_MEDIA,
        data_type: DataType::U16,
        control_type: ControlType::Variable,
        name: "Format Media",
        form: ControlFormSeed::Values(CONTROL_MEDIA_FORMAT),
    },
    notch!(ctrl::REMOTE_TOUCH_XY, U32, "Remote Touch (x, y)", 0, 0xFFFF_FFFF),
    button!(ctrl::REMOTE_TOUCH_CANCEL, "Remote Touch Cancel"),
    button!(ctrl::S1_AND_S2_BUTTON, "S1 & S2 Button"),
    button!(ctrl::FORMAT_MEDIA_CANCEL, "Format Media Cancel"),
    ControlSeed {
        code: ctrl::SAVE_ZOOM_AND_FOCUS_POSITION,
        data_type: DataType::U8,
        control_type: ControlType::Notch,
        name: "Save Zoom and Focus Position",
        form: ControlFormSeed::None,
    },
    ControlSeed {
        code: ctrl::LOAD_ZOOM_AND_FOCUS_POSITION,
        data_type: DataType::U8,
        control_type: ControlType::Notch,
        name: "Load Zoom and Focus Position",
        form: ControlFormSeed::None,
    },
    button!(ctrl::APS_C_FULL_TOGGLE, "APS-C / Full Toggle"),
    notch!(ctrl::COLOR_TEMPERATURE_STEP, I16, "Color Temperature Step", -30, 30),
    notch!(ctrl::WHITE_BALANCE_TINT_STEP, I16, "White Balance Tint Step", -198, 198),
    ControlSeed {
        code: ctrl::FOCUS_OPERATION,
        data_type: DataType::I8,
        control_type: ControlType::Variable,
        name: "Focus Operation",
        form: ControlFormSeed::Range {
            min: -1,
            max: 1,
            step: 1,
        },
    },
    button!(ctrl::FLICKER_SCAN, "Flicker Scan"),
    button!(ctrl::SETTINGS_RESET, "Settings Reset"),
    button!(ctrl::PIXEL_MAPPING, "Pixel Mapping"),
    button!(ctrl::POWER_OFF, "Power Off"),
    button!(ctrl::TIME_CODE_PRESET_RESET, "Time Code Preset Reset"),
    button!(ctrl::USER_BIT_PRESET_RESET, "User Bit Preset Reset"),
    button!(ctrl::SENSOR_CLEANING, "Sensor Cleaning"),
    button!(ctrl::RESET_PICTURE_PROFILE, "Reset Picture Profile"),
    button!(ctrl::RESET_CREATIVE_LOOK, "Reset Creative Look"),
    notch!(ctrl::SHUTTER_ECS_NUMBER_STEP, I16, "Shutter ECS Number Step", -32768, 32767),
    button!(ctrl::MOVIE_RECORD_TOGGLE, "Movie Record Toggle"),
    button!(ctrl::FOCUS_POSITION_CANCEL, "Focus Position Cancel"),
];

pub(crate) fn control_seed(code: u16) -> Option<&'static ControlSeed> {
    CONTROL_SEEDS.iter().find(|seed| seed.code == code)
}
