use crate::types::{Aggregates, GroupKey, GroupTotal, Kpis, SalesRecord, StateTotal, TreemapNode};
use crate::util::average;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub const TOP_STATES: usize = 15;
pub const TOP_CUSTOMERS: usize = 10;
pub const TOP_CITIES: usize = 10;

/// Sum `metric` per `key`, keeping groups in the order they were first seen.
fn group_sum<K, F, M>(data: &[SalesRecord], key: F, metric: M) -> Vec<(K, f64)>
where
    K: Eq + Hash + Clone,
    F: Fn(&SalesRecord) -> K,
    M: Fn(&SalesRecord) -> f64,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, f64)> = Vec::new();
    for r in data {
        let k = key(r);
        match index.get(&k) {
            Some(&i) => groups[i].1 += metric(r),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, metric(r)));
            }
        }
    }
    groups
}

/// Stable descending sort on the summed value; ties keep discovery order.
fn sort_desc<K>(groups: &mut [(K, f64)]) {
    groups.sort_by(|a, b| b.1.total_cmp(&a.1));
}

fn into_totals(groups: Vec<(GroupKey, f64)>) -> Vec<GroupTotal> {
    groups
        .into_iter()
        .map(|(key, value)| GroupTotal { key, value })
        .collect()
}

fn ranked_by<F, M>(data: &[SalesRecord], key: F, metric: M, top: Option<usize>) -> Vec<GroupTotal>
where
    F: Fn(&SalesRecord) -> GroupKey,
    M: Fn(&SalesRecord) -> f64,
{
    let mut groups = group_sum(data, key, metric);
    sort_desc(&mut groups);
    if let Some(n) = top {
        groups.truncate(n);
    }
    into_totals(groups)
}

pub fn build_kpis(data: &[SalesRecord]) -> Kpis {
    let orders: HashSet<&str> = data.iter().filter_map(|r| r.order_id.as_deref()).collect();
    let customers: HashSet<&str> = data
        .iter()
        .filter_map(|r| r.customer_name.as_deref())
        .collect();
    let discounts: Vec<f64> = data.iter().filter_map(|r| r.discount).collect();
    Kpis {
        total_sales: data.iter().map(|r| r.sales).sum(),
        total_profit: data.iter().map(|r| r.profit).sum(),
        total_orders: orders.len(),
        total_customers: customers.len(),
        avg_discount: average(&discounts),
    }
}

/// Sales per `YYYY-MM`, oldest month first; undated sales come last.
pub fn monthly_sales(data: &[SalesRecord]) -> Vec<GroupTotal> {
    let mut groups = group_sum(data, |r| GroupKey::from(r.year_month.as_deref()), |r| r.sales);
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    into_totals(groups)
}

pub fn sales_by_region(data: &[SalesRecord]) -> Vec<GroupTotal> {
    ranked_by(data, |r| GroupKey::value(r.region.as_str()), |r| r.sales, None)
}

pub fn profit_by_region(data: &[SalesRecord]) -> Vec<GroupTotal> {
    ranked_by(data, |r| GroupKey::value(r.region.as_str()), |r| r.profit, None)
}

pub fn sales_by_state(data: &[SalesRecord]) -> Vec<StateTotal> {
    let mut groups = group_sum(
        data,
        |r| (r.region.clone(), GroupKey::from(r.state.as_deref())),
        |r| r.sales,
    );
    sort_desc(&mut groups);
    groups
        .into_iter()
        .take(TOP_STATES)
        .map(|((region, state), sales)| StateTotal { region, state, sales })
        .collect()
}

pub fn sales_by_category(data: &[SalesRecord]) -> Vec<GroupTotal> {
    ranked_by(data, |r| GroupKey::from(r.category.as_deref()), |r| r.sales, None)
}

/// Category -> sub category hierarchy weighted by sales. Both levels keep
/// the order in which they first appear in the data.
pub fn sales_treemap(data: &[SalesRecord]) -> Vec<TreemapNode> {
    let leaves = group_sum(
        data,
        |r| {
            (
                GroupKey::from(r.category.as_deref()),
                GroupKey::from(r.sub_category.as_deref()),
            )
        },
        |r| r.sales,
    );

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut nodes: Vec<TreemapNode> = Vec::new();
    for ((category, sub_category), sales) in leaves {
        let i = *index.entry(category.clone()).or_insert_with(|| {
            nodes.push(TreemapNode {
                category,
                sales: 0.0,
                children: Vec::new(),
            });
            nodes.len() - 1
        });
        nodes[i].sales += sales;
        nodes[i].children.push(GroupTotal {
            key: sub_category,
            value: sales,
        });
    }
    nodes
}

pub fn sales_by_customer(data: &[SalesRecord]) -> Vec<GroupTotal> {
    ranked_by(
        data,
        |r| GroupKey::from(r.customer_name.as_deref()),
        |r| r.sales,
        Some(TOP_CUSTOMERS),
    )
}

pub fn sales_by_city(data: &[SalesRecord]) -> Vec<GroupTotal> {
    ranked_by(
        data,
        |r| GroupKey::from(r.city.as_deref()),
        |r| r.sales,
        Some(TOP_CITIES),
    )
}

pub fn build_aggregates(data: &[SalesRecord]) -> Aggregates {
    Aggregates {
        monthly_sales: monthly_sales(data),
        sales_by_region: sales_by_region(data),
        profit_by_region: profit_by_region(data),
        sales_by_state: sales_by_state(data),
        sales_by_category: sales_by_category(data),
        sales_treemap: sales_treemap(data),
        sales_by_customer: sales_by_customer(data),
        sales_by_city: sales_by_city(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(order: &str, region: &str, sales: f64) -> SalesRecord {
        SalesRecord {
            order_id: Some(order.to_string()),
            customer_name: Some(format!("cust-{order}")),
            category: Some("Snacks".to_string()),
            sub_category: Some("Cookies".to_string()),
            city: Some("Vellore".to_string()),
            region: region.to_string(),
            state: Some("Tamil Nadu".to_string()),
            order_date: None,
            year: None,
            month_name: None,
            year_month: None,
            sales,
            profit: sales / 10.0,
            discount: Some(0.1),
        }
    }

    fn pairs(rows: &[GroupTotal]) -> Vec<(String, f64)> {
        rows.iter().map(|g| (g.key.to_string(), g.value)).collect()
    }

    #[test]
    fn region_sales_sorted_descending() {
        let data = vec![rec("1", "North", 100.0), rec("2", "South", 200.0), rec("3", "North", 50.0)];
        assert_eq!(
            pairs(&sales_by_region(&data)),
            vec![("South".to_string(), 200.0), ("North".to_string(), 150.0)]
        );
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let data = vec![
            rec("1", "West", 10.0),
            rec("2", "East", 30.0),
            rec("3", "Central", 10.0),
            rec("4", "North", 10.0),
        ];
        assert_eq!(
            pairs(&sales_by_region(&data)),
            vec![
                ("East".to_string(), 30.0),
                ("West".to_string(), 10.0),
                ("Central".to_string(), 10.0),
                ("North".to_string(), 10.0),
            ]
        );
    }

    #[test]
    fn profit_by_region_uses_profit() {
        let mut a = rec("1", "North", 100.0);
        a.profit = -5.0;
        let mut b = rec("2", "South", 10.0);
        b.profit = 3.0;
        assert_eq!(
            pairs(&profit_by_region(&[a, b])),
            vec![("South".to_string(), 3.0), ("North".to_string(), -5.0)]
        );
    }

    #[test]
    fn months_come_out_chronologically() {
        let mut feb = rec("1", "North", 50.0);
        feb.year_month = Some("2023-02".to_string());
        let mut jan = rec("2", "North", 100.0);
        jan.year_month = Some("2023-01".to_string());
        let undated = rec("3", "North", 7.0);
        assert_eq!(
            pairs(&monthly_sales(&[undated, feb, jan])),
            vec![
                ("2023-01".to_string(), 100.0),
                ("2023-02".to_string(), 50.0),
                ("(missing)".to_string(), 7.0),
            ]
        );
    }

    #[test]
    fn state_sales_keeps_top_fifteen() {
        let data: Vec<SalesRecord> = (0..20)
            .map(|i| {
                let mut r = rec(&i.to_string(), "North", i as f64);
                r.state = Some(format!("S{i}"));
                r
            })
            .collect();
        let states = sales_by_state(&data);
        assert_eq!(states.len(), 15);
        assert_eq!(states[0].state, GroupKey::value("S19"));
        assert_eq!(states[14].state, GroupKey::value("S5"));
        assert!(states.windows(2).all(|w| w[0].sales >= w[1].sales));
    }

    #[test]
    fn state_groups_by_region_and_state() {
        let mut a = rec("1", "North", 10.0);
        a.state = Some("Delhi".to_string());
        let mut b = rec("2", "South", 20.0);
        b.state = Some("Delhi".to_string());
        let states = sales_by_state(&[a.clone(), b, a]);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].region, "North");
        assert_eq!(states[0].sales, 20.0);
        assert_eq!(states[1].region, "South");
    }

    #[test]
    fn customers_and_cities_truncate_after_sorting() {
        let data: Vec<SalesRecord> = (0..12)
            .map(|i| {
                let mut r = rec(&i.to_string(), "North", (i * 10) as f64);
                r.city = Some(format!("City{i}"));
                r
            })
            .collect();
        let customers = sales_by_customer(&data);
        assert_eq!(customers.len(), 10);
        assert_eq!(customers[0].key, GroupKey::value("cust-11"));
        assert_eq!(customers[9].key, GroupKey::value("cust-2"));
        let cities = sales_by_city(&data);
        assert_eq!(cities.len(), 10);
        assert_eq!(cities[0].key, GroupKey::value("City11"));
    }

    #[test]
    fn treemap_nests_sub_categories() {
        let mut a = rec("1", "North", 10.0);
        a.category = Some("Oil & Masala".to_string());
        a.sub_category = Some("Spices".to_string());
        let b = rec("2", "North", 5.0);
        let mut c = rec("3", "North", 2.0);
        c.category = Some("Oil & Masala".to_string());
        c.sub_category = None;
        let d = rec("4", "South", 1.0);
        let tree = sales_treemap(&[a, b, c, d]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category, GroupKey::value("Oil & Masala"));
        assert_eq!(tree[0].sales, 12.0);
        assert_eq!(
            pairs(&tree[0].children),
            vec![("Spices".to_string(), 10.0), ("(missing)".to_string(), 2.0)]
        );
        assert_eq!(tree[1].sales, 6.0);
        assert_eq!(pairs(&tree[1].children), vec![("Cookies".to_string(), 6.0)]);
    }

    #[test]
    fn kpis_count_distinct_orders_and_customers() {
        let mut a = rec("OD1", "North", 100.0);
        a.discount = Some(0.2);
        let mut b = rec("OD1", "South", 50.0);
        b.customer_name = a.customer_name.clone();
        b.discount = None;
        let mut c = rec("OD2", "South", 25.0);
        c.order_id = None;
        c.discount = Some(0.1);
        let kpis = build_kpis(&[a, b, c]);
        assert_eq!(kpis.total_sales, 175.0);
        assert_eq!(kpis.total_profit, 17.5);
        assert_eq!(kpis.total_orders, 1);
        assert_eq!(kpis.total_customers, 2);
        let avg = kpis.avg_discount.unwrap();
        assert!((avg - 0.15).abs() < 1e-12);
    }

    #[test]
    fn empty_input_degrades_to_zero() {
        let kpis = build_kpis(&[]);
        assert_eq!(
            kpis,
            Kpis {
                total_sales: 0.0,
                total_profit: 0.0,
                total_orders: 0,
                total_customers: 0,
                avg_discount: None,
            }
        );
        let agg = build_aggregates(&[]);
        assert!(agg.monthly_sales.is_empty());
        assert!(agg.sales_by_region.is_empty());
        assert!(agg.profit_by_region.is_empty());
        assert!(agg.sales_by_state.is_empty());
        assert!(agg.sales_by_category.is_empty());
        assert!(agg.sales_treemap.is_empty());
        assert!(agg.sales_by_customer.is_empty());
        assert!(agg.sales_by_city.is_empty());
    }
}
