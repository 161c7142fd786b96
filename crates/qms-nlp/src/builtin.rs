//! Built-in rule set, used when no rule store is configured or the store
//! yields nothing usable.

use serde_json::{json, Value};

/// Built-in rule records, in catalog order.
pub fn records() -> Vec<Value> {
    vec![
        json!({
            "intent_name": "BOE供应商库存查询",
            "description": "查询BOE供应商的库存物料",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM inventory WHERE supplier_name = 'BOE' ORDER BY inbound_time DESC LIMIT 50",
            "parameters": [],
            "trigger_words": ["BOE", "供应商", "库存"],
            "synonyms": {},
            "example_query": "BOE供应商库存",
            "priority": 3
        }),
        json!({
            "intent_name": "库存查询",
            "description": "按条件查询库存物料",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM inventory WHERE 1=1 \
                {% if factory %}AND factory = '{{ factory }}'{% endif %} \
                {% if warehouse %}AND warehouse = '{{ warehouse }}'{% endif %} \
                {% if supplier %}AND supplier_name LIKE CONCAT('%', '{{ supplier }}', '%'){% endif %} \
                {% if material %}AND material_name LIKE CONCAT('%', '{{ material }}', '%'){% endif %} \
                {% if status %}AND status = '{{ status }}'{% endif %} \
                ORDER BY inbound_time DESC LIMIT 50",
            "parameters": [
                {"name": "factory"},
                {"name": "warehouse"},
                {"name": "supplier"},
                {"name": "material"},
                {"name": "status"}
            ],
            "trigger_words": ["库存", "存货"],
            "synonyms": {},
            "example_query": "查询电池盖的库存",
            "priority": 2
        }),
        json!({
            "intent_name": "工厂库存查询",
            "description": "查询指定工厂的库存情况",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM inventory WHERE factory = '{{ factory }}' \
                {% if status %}AND status = '{{ status }}'{% endif %} \
                {% if material %}AND material_name LIKE CONCAT('%', '{{ material }}', '%'){% endif %} \
                {% if supplier %}AND supplier_name = '{{ supplier }}'{% endif %} \
                ORDER BY inbound_time DESC LIMIT 50",
            "parameters": [
                {"name": "factory", "required": true},
                {"name": "status"},
                {"name": "material"},
                {"name": "supplier"}
            ],
            "trigger_words": ["工厂", "库存"],
            "synonyms": {"工厂": ["厂区", "基地"]},
            "example_query": "查询深圳工厂的库存",
            "priority": 3
        }),
        json!({
            "intent_name": "风险库存查询",
            "description": "查询风险状态的库存物料",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM inventory WHERE status = '风险' \
                {% if factory %}AND factory = '{{ factory }}'{% endif %} \
                {% if supplier %}AND supplier_name = '{{ supplier }}'{% endif %} \
                {% if material %}AND material_name LIKE CONCAT('%', '{{ material }}', '%'){% endif %} \
                ORDER BY inbound_time DESC LIMIT 50",
            "parameters": [
                {"name": "factory"},
                {"name": "supplier"},
                {"name": "material"}
            ],
            "trigger_words": ["风险库存", "风险物料"],
            "synonyms": {"风险": ["异常", "危险", "高风险"]},
            "example_query": "有哪些风险库存",
            "priority": 3
        }),
        json!({
            "intent_name": "冻结库存查询",
            "description": "查询被冻结的库存物料",
            "action_type": "DATA_QUERY",
            "action_target": "inventory",
            "parameters": [
                {"name": "factory"},
                {"name": "supplier"},
                {"name": "status"}
            ],
            "trigger_words": ["冻结库存", "冻结"],
            "synonyms": {"冻结": ["锁定", "封存"]},
            "example_query": "查看冻结库存",
            "priority": 3
        }),
        json!({
            "intent_name": "供应商质量查询",
            "description": "查询供应商来料检验结果",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM lab_tests WHERE 1=1 \
                {% if supplier %}AND supplier_name = '{{ supplier }}'{% endif %} \
                {% if material %}AND material_name LIKE CONCAT('%', '{{ material }}', '%'){% endif %} \
                {% if test_result %}AND test_result = '{{ test_result }}'{% endif %} \
                {% if batch_code %}AND batch_code = '{{ batch_code }}'{% endif %} \
                ORDER BY test_date DESC LIMIT 50",
            "parameters": [
                {"name": "supplier"},
                {"name": "material"},
                {"name": "test_result"},
                {"name": "batch_code"}
            ],
            "trigger_words": ["供应商质量", "质量", "检验", "测试结果"],
            "synonyms": {"不合格": ["NG", "不良"]},
            "example_query": "BOE供应商质量如何",
            "priority": 2
        }),
        json!({
            "intent_name": "供应商质量排名",
            "description": "按检验合格率对供应商排名",
            "action_type": "FUNCTION_CALL",
            "action_target": "supplier_quality",
            "parameters": [
                {"name": "material"}
            ],
            "trigger_words": ["排名", "质量排名", "合格率"],
            "synonyms": {"排名": ["排行", "排序"]},
            "example_query": "供应商质量排名",
            "priority": 2
        }),
        json!({
            "intent_name": "批次追溯",
            "description": "追溯批次的库存、检验和上线记录",
            "action_type": "FUNCTION_CALL",
            "action_target": "batch_trace",
            "parameters": [
                {"name": "batch_code", "required": true}
            ],
            "trigger_words": ["批次", "追溯", "批号"],
            "synonyms": {},
            "example_query": "查询批次SK1234567的信息",
            "priority": 2
        }),
        json!({
            "intent_name": "上线情况查询",
            "description": "查询物料上线跟踪与不良率",
            "action_type": "SQL_QUERY",
            "action_target": "SELECT * FROM online_tracking WHERE 1=1 \
                {% if factory %}AND factory = '{{ factory }}'{% endif %} \
                {% if supplier %}AND supplier_name = '{{ supplier }}'{% endif %} \
                {% if material %}AND material_name LIKE CONCAT('%', '{{ material }}', '%'){% endif %} \
                {% if batch_code %}AND batch_code = '{{ batch_code }}'{% endif %} \
                ORDER BY online_date DESC LIMIT 50",
            "parameters": [
                {"name": "factory"},
                {"name": "supplier"},
                {"name": "material"},
                {"name": "batch_code"}
            ],
            "trigger_words": ["上线", "生产线", "不良率"],
            "synonyms": {"上线": ["上线情况", "上线跟踪"]},
            "example_query": "深圳工厂上线情况",
            "priority": 2
        }),
        json!({
            "intent_name": "库存汇总",
            "description": "按工厂与状态汇总库存数量",
            "action_type": "FUNCTION_CALL",
            "action_target": "inventory_summary",
            "parameters": [
                {"name": "factory"},
                {"name": "supplier"}
            ],
            "trigger_words": ["汇总", "统计"],
            "synonyms": {"汇总": ["合计", "总计", "概况"]},
            "example_query": "库存汇总",
            "priority": 2
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{IntentRule, RuleRecord};
    use std::collections::HashSet;

    #[test]
    fn test_builtin_records_are_valid() {
        let records = records();
        let mut names = HashSet::new();
        for value in records {
            let record: RuleRecord = serde_json::from_value(value).unwrap();
            assert!(names.insert(record.intent_name.clone()), "duplicate rule name");
            let rule = IntentRule::from_record(record).unwrap();
            assert!(rule.is_active());
            assert!(rule.example_query.is_some());
        }
        assert_eq!(names.len(), 10);
    }
}
