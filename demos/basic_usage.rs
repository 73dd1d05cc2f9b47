//! Basic usage example for minipb
//!
//! Run with: cargo run --example basic_usage

use std::cell::Cell;

use minipb::*;

fn main() -> Result<()> {
    println!("minipb Basic Usage Example");
    println!("==========================");

    let mut builder = SchemaBuilder::new();
    let order = builder.message("Order");
    let leg = builder.message("Leg");
    builder
        .field(order, FieldSpec::new(1, "id", FieldType::UInt64))
        .field(order, FieldSpec::new(2, "account", FieldType::String))
        .field(order, FieldSpec::new(3, "legs", FieldType::Message(leg)).repeated())
        .field(order, FieldSpec::new(4, "flags", FieldType::SInt32).repeated())
        .field(
            order,
            FieldSpec::new(5, "priority", FieldType::UInt32).optional(Value::UInt32(5)),
        );
    builder
        .field(leg, FieldSpec::new(1, "symbol", FieldType::String))
        .field(leg, FieldSpec::new(2, "price", FieldType::SInt64))
        .field(leg, FieldSpec::new(3, "qty", FieldType::UInt32));
    let schema = builder.build()?;

    let layout = schema.layout(order).ok_or(Error::TypeMismatch)?;
    let leg_layout = schema.layout(leg).ok_or(Error::TypeMismatch)?;
    let field = |layout: &'static str, number| {
        schema
            .message_by_name(layout)
            .and_then(|l| l.field_by_number(number))
            .ok_or(Error::TypeMismatch)
    };

    // Example 1: Build and encode a message
    println!("\n1. Build and Encode:");
    let mut msg = layout.new_message();
    msg.set(field("Order", 1)?, Value::UInt64(90210))?;
    msg.set(field("Order", 2)?, Value::string(b"ACME-7"))?;
    for (symbol, price, qty) in [("AAPL", 189_250_000i64, 100u32), ("TSLA", -2_500_000, 5)] {
        let entry = msg.append_message(field("Order", 3)?, &schema)?;
        entry.set(field("Leg", 1)?, Value::string(symbol.as_bytes()))?;
        entry.set(field("Leg", 2)?, Value::Int64(price))?;
        entry.set(field("Leg", 3)?, Value::UInt32(qty))?;
    }
    msg.append(field("Order", 4)?, Value::Int32(-1))?;
    msg.append(field("Order", 4)?, Value::Int32(64))?;

    let bytes = encode(&msg, &schema)?;
    println!("  Encoded {} bytes: {:02X?}", bytes.len(), &bytes[..bytes.len().min(16)]);

    // Example 2: Decode into a fresh message
    println!("\n2. Decode:");
    let mut decoded = layout.new_message();
    let mut arena = Arena::new();
    decode(&bytes, &mut decoded, &schema, &mut arena)?;
    println!(
        "  id={:?} account={:?} legs={}",
        decoded.get(field("Order", 1)?),
        decoded.bytes(field("Order", 2)?).map(String::from_utf8_lossy),
        decoded.array(field("Order", 3)?).map_or(0, Array::len),
    );
    println!(
        "  priority (schema default)={:?}",
        decoded.get_or_default(field("Order", 5)?)?
    );
    println!("  equal to original: {}", decoded == msg);
    println!("  first parse: {:?}", arena.stats());

    // Example 3: Recycling across parses
    println!("\n3. Recycled Decode:");
    arena.reset();
    decoded.clear();
    decode(&bytes, &mut decoded, &schema, &mut arena)?;
    let stats = arena.stats();
    println!(
        "  allocations={} recycled={} bytes_copied={}",
        stats.allocations(),
        stats.recycled,
        stats.bytes_copied
    );

    // Example 4: Push dispatch with per-field closures
    println!("\n4. Handler Table:");
    let mut notional = 0i64;
    {
        let price = Cell::new(0i64);
        let mut table = HandlerTable::new();
        table
            .on_submessage(order, 3, |_| Flow::Continue)
            .on_value(leg, 2, |_, value| {
                price.set(value.as_i64().unwrap_or(0));
                Flow::Continue
            })
            .on_value(leg, 3, |_, value| {
                notional += price.get() * value.as_i64().unwrap_or(0);
                Flow::Continue
            });
        let mut status = Status::new();
        run_handlers(&decoded, &schema, &mut table, &mut status);
        println!("  values={} ok={}", status.values(), status.ok());
    }
    println!("  notional={}", notional);

    // Example 5: Copy and error handling
    println!("\n5. Copy and Errors:");
    let copy = copy_message(&decoded, &schema)?;
    println!("  copy equal: {}", copy == decoded);

    let mut bad = layout.new_message();
    match decode(&bytes[..bytes.len() - 1], &mut bad, &schema, &mut Arena::new()) {
        Ok(()) => println!("  truncated input decoded (unexpected)"),
        Err(e) => println!("  truncated input rejected: {}", e),
    }
    let mut leg_msg = leg_layout.new_message();
    match leg_msg.set(field("Order", 1)?, Value::UInt64(1)) {
        Ok(()) => println!("  foreign field accepted (unexpected)"),
        Err(e) => println!("  foreign field rejected: {}", e),
    }

    println!("\nAll examples completed successfully!");
    Ok(())
}
