//! Keyword tables for parameter extraction.
//!
//! Pairs are `(surface form, canonical value)`. Order inside a literal table
//! does not matter; the extractor sorts longest-first.

pub const FACTORIES: &[(&str, &str)] = &[
    ("深圳工厂", "深圳工厂"),
    ("重庆工厂", "重庆工厂"),
    ("南昌工厂", "南昌工厂"),
    ("宜宾工厂", "宜宾工厂"),
    ("深圳", "深圳工厂"),
    ("重庆", "重庆工厂"),
    ("南昌", "南昌工厂"),
    ("宜宾", "宜宾工厂"),
];

pub const WAREHOUSES: &[(&str, &str)] = &[
    ("中央库存", "中央库存"),
    ("中央仓", "中央库存"),
    ("重庆库存", "重庆库存"),
    ("重庆仓", "重庆库存"),
    ("深圳库存", "深圳库存"),
    ("深圳仓", "深圳库存"),
];

pub const SUPPLIERS: &[(&str, &str)] = &[
    ("BOE", "BOE"),
    ("天马", "天马"),
    ("华星", "华星"),
    ("聚龙", "聚龙"),
    ("欣冠", "欣冠"),
    ("广正", "广正"),
    ("帝晶", "帝晶"),
    ("东声", "东声"),
    ("瑞声", "瑞声"),
    ("歌尔", "歌尔"),
    ("丽德宝", "丽德宝"),
    ("裕同", "裕同"),
    ("富群", "富群"),
    ("深奥", "深奥"),
    ("百俊达", "百俊达"),
    ("奥海", "奥海"),
    ("辉阳", "辉阳"),
    ("理威", "理威"),
    ("风华", "风华"),
    ("维科", "维科"),
    ("盛泰", "盛泰"),
    ("怡同", "怡同"),
];

/// Alternate company names, tried after the literal table.
pub const SUPPLIER_ALIASES: &[(&str, &[&str])] = &[
    ("BOE", &["京东方"]),
    ("天马", &["天马微", "天马微电子"]),
    ("华星", &["华星光电", "TCL华星"]),
    ("瑞声", &["AAC"]),
];

pub const MATERIALS: &[(&str, &str)] = &[
    ("电池盖", "电池盖"),
    ("电池", "电池"),
    ("中框", "中框"),
    ("手机卡托", "手机卡托"),
    ("卡托", "手机卡托"),
    ("侧键", "侧键"),
    ("装饰件", "装饰件"),
    ("LCD显示屏", "LCD显示屏"),
    ("OLED显示屏", "OLED显示屏"),
    ("LCD", "LCD显示屏"),
    ("OLED", "OLED显示屏"),
    ("摄像头模组", "摄像头模组"),
    ("摄像头", "摄像头模组"),
    ("充电器", "充电器"),
    ("扬声器", "扬声器"),
    ("喇叭", "扬声器"),
    ("听筒", "听筒"),
    ("保护套", "保护套"),
    ("标签", "标签"),
    ("包装盒", "包装盒"),
];

pub const STATUSES: &[(&str, &str)] = &[
    ("正常", "正常"),
    ("风险", "风险"),
    ("冻结", "冻结"),
];

/// Broader terms used when no literal status is present.
pub const STATUS_SYNONYMS: &[(&str, &[&str])] = &[
    ("风险", &["异常", "危险", "问题"]),
    ("冻结", &["锁定", "封存"]),
    ("正常", &["良好", "安全"]),
];

pub const TEST_RESULTS: &[(&str, &str)] = &[
    ("不合格", "NG"),
    ("合格", "OK"),
    ("不通过", "NG"),
    ("通过", "OK"),
    ("NG", "NG"),
];

/// Strict batch format: two letters followed by seven digits.
pub const BATCH_STRICT_PATTERN: &str = r"[A-Z]{2}\d{7}";

/// Loose batch format: six or more uppercase letters or digits.
pub const BATCH_LOOSE_PATTERN: &str = r"[A-Z0-9]{6,}";
